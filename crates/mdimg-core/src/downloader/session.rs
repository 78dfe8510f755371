//! Reusable HTTP session: one libcurl easy handle shared by every GET.
//!
//! Reusing the handle keeps connections alive between images on the same host
//! and applies the same headers and redirect policy to every request.

use crate::control::InterruptFlag;
use crate::retry::FetchError;
use curl::easy::{Easy, List};
use std::str;
use std::time::Duration;

/// Desktop browser User-Agent; some image hosts reject unknown clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_REDIRECTS: u32 = 10;

pub struct HttpSession {
    easy: Easy,
}

impl HttpSession {
    /// Builds the session; `user_agent` overrides the browser default.
    pub fn new(user_agent: Option<&str>) -> Result<Self, curl::Error> {
        let mut easy = Easy::new();
        easy.get(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        easy.connect_timeout(CONNECT_TIMEOUT)?;
        easy.useragent(user_agent.unwrap_or(BROWSER_USER_AGENT))?;
        // Empty string: accept every encoding libcurl can decode.
        easy.accept_encoding("")?;
        // Needed for the progress callback that watches the interrupt flag.
        easy.progress(true)?;

        let mut list = List::new();
        list.append(&format!("Accept: {}", ACCEPT))?;
        list.append(&format!("Accept-Language: {}", ACCEPT_LANGUAGE))?;
        easy.http_headers(list)?;

        Ok(Self { easy })
    }

    /// Performs one GET and returns the body.
    ///
    /// Non-2xx HTTP statuses become `FetchError::Http` (with `Retry-After` when
    /// sent). The transfer is aborted as soon as `interrupt` is set.
    pub fn get(
        &mut self,
        url: &str,
        timeout: Duration,
        interrupt: &InterruptFlag,
    ) -> Result<Vec<u8>, FetchError> {
        self.easy.url(url).map_err(FetchError::Curl)?;
        // A zero timeout disables curl's limit entirely.
        let timeout = timeout.max(Duration::from_millis(1));
        self.easy.timeout(timeout).map_err(FetchError::Curl)?;

        let mut body = Vec::new();
        let mut retry_after = None;
        {
            let mut transfer = self.easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(FetchError::Curl)?;
            transfer
                .header_function(|line| {
                    if line.starts_with(b"HTTP/") {
                        // New response (e.g. after a redirect).
                        retry_after = None;
                    } else if let Some(d) = parse_retry_after(line) {
                        retry_after = Some(d);
                    }
                    true
                })
                .map_err(FetchError::Curl)?;
            transfer
                .progress_function(|_, _, _, _| !interrupt.is_set())
                .map_err(FetchError::Curl)?;

            if let Err(e) = transfer.perform() {
                if e.is_aborted_by_callback() && interrupt.is_set() {
                    return Err(FetchError::Interrupted);
                }
                return Err(FetchError::Curl(e));
            }
        }

        if is_ftp(url) {
            return Ok(body);
        }
        let code = self.easy.response_code().map_err(FetchError::Curl)?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http { code, retry_after });
        }
        Ok(body)
    }
}

fn is_ftp(url: &str) -> bool {
    url.get(..6)
        .map_or(false, |scheme| scheme.eq_ignore_ascii_case("ftp://"))
}

/// Parses a `Retry-After: <seconds>` header line. HTTP-date values are ignored.
fn parse_retry_after(line: &[u8]) -> Option<Duration> {
    let line = str::from_utf8(line).ok()?;
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("retry-after") {
        return None;
    }
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_seconds() {
        assert_eq!(
            parse_retry_after(b"Retry-After: 7\r\n"),
            Some(Duration::from_secs(7))
        );
        assert_eq!(
            parse_retry_after(b"retry-after:120"),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn retry_after_ignores_dates_and_other_headers() {
        assert_eq!(
            parse_retry_after(b"Retry-After: Wed, 21 Oct 2015 07:28:00 GMT\r\n"),
            None
        );
        assert_eq!(parse_retry_after(b"Content-Length: 12\r\n"), None);
        assert_eq!(parse_retry_after(b"HTTP/1.1 503 Service Unavailable\r\n"), None);
    }

    #[test]
    fn ftp_detection() {
        assert!(is_ftp("ftp://files.example.com/a.png"));
        assert!(is_ftp("FTP://files.example.com/a.png"));
        assert!(!is_ftp("https://example.com/a.png"));
        assert!(!is_ftp("ftp"));
    }

    #[test]
    fn session_builds_without_network() {
        assert!(HttpSession::new(None).is_ok());
        assert!(HttpSession::new(Some("mdimg-test")).is_ok());
    }
}
