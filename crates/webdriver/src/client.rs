use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, warn};

use courtbot_core::config::WebDriverConfig;

use crate::error::WebDriverError;
use crate::locator::Locator;

/// W3C element-reference key used in find responses and script args.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Remote browser session handle. Exclusively owned by the flow that
/// created it; never shared across flows.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
}

/// Reference to an element inside one session.
#[derive(Debug, Clone)]
pub struct ElementRef {
    pub id: String,
}

impl ElementRef {
    /// Element encoded as a script argument.
    pub fn as_arg(&self) -> Value {
        json!({ ELEMENT_KEY: self.id })
    }
}

/// HTTP client for the browser-automation wire protocol. Every call is a
/// live round trip against the endpoint; nothing is cached client-side.
#[derive(Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base: String,
    config: WebDriverConfig,
}

impl WebDriverClient {
    pub fn new(config: WebDriverConfig) -> Result<Self, WebDriverError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            base: config.endpoint.trim_end_matches('/').to_string(),
            http,
            config,
        })
    }

    /// Create a remote session with the configured capability payload.
    pub async fn new_session(&self) -> Result<Session, WebDriverError> {
        let mut args = vec![
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-infobars".to_string(),
            "--no-default-browser-check".to_string(),
            "--no-first-run".to_string(),
            format!("--window-size={},{}", self.config.window_width, self.config.window_height),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }

        let payload = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "pageLoadStrategy": "normal",
                    "goog:chromeOptions": {
                        "args": args,
                        "excludeSwitches": ["enable-automation"],
                    }
                }
            }
        });

        let value = self.post("/session", &payload).await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WebDriverError::Protocol(format!("session response missing sessionId: {}", value))
            })?;

        debug!(session = id, "created browser session");
        Ok(Session { id: id.to_string() })
    }

    pub async fn delete_session(&self, session: &Session) -> Result<(), WebDriverError> {
        self.delete(&format!("/session/{}", session.id)).await?;
        debug!(session = %session.id, "deleted browser session");
        Ok(())
    }

    pub async fn navigate(&self, session: &Session, url: &str) -> Result<(), WebDriverError> {
        self.post(&format!("/session/{}/url", session.id), &json!({ "url": url }))
            .await
            .map_err(|e| e.for_operation(WebDriverError::Navigation))?;
        Ok(())
    }

    /// Find a single element with one strategy.
    pub async fn find_element(
        &self,
        session: &Session,
        locator: &Locator,
    ) -> Result<ElementRef, WebDriverError> {
        let (using, value) = locator.strategy();
        let response = self
            .post(
                &format!("/session/{}/element", session.id),
                &json!({ "using": using, "value": value }),
            )
            .await?;

        element_from_value(&response)
            .ok_or_else(|| WebDriverError::Protocol(format!("find response missing element: {}", response)))
    }

    /// Walk an ordered list of strategies, stopping at the first hit.
    /// Only transport breakage aborts the walk early.
    pub async fn find_first(
        &self,
        session: &Session,
        locators: &[Locator],
    ) -> Result<ElementRef, WebDriverError> {
        for locator in locators {
            match self.find_element(session, locator).await {
                Ok(el) => {
                    debug!(%locator, "element found");
                    return Ok(el);
                }
                Err(WebDriverError::ElementNotFound(_)) => continue,
                Err(WebDriverError::Timeout(_)) => continue,
                Err(other) => return Err(other),
            }
        }

        let tried: Vec<String> = locators.iter().map(|l| l.to_string()).collect();
        Err(WebDriverError::ElementNotFound(tried.join(", ")))
    }

    /// Native click, falling back to a script-dispatched click on the same
    /// element when the endpoint refuses.
    pub async fn click(&self, session: &Session, element: &ElementRef) -> Result<(), WebDriverError> {
        let native = self
            .post(
                &format!("/session/{}/element/{}/click", session.id, element.id),
                &json!({}),
            )
            .await;

        match native {
            Ok(_) => Ok(()),
            Err(WebDriverError::Transport(e)) => Err(WebDriverError::Transport(e)),
            Err(first) => {
                warn!(error = %first, "native click refused, falling back to script click");
                self.execute(session, "arguments[0].click();", vec![element.as_arg()])
                    .await
                    .map(|_| ())
            }
        }
    }

    /// Append text to an element in one round trip (batch mode typing).
    pub async fn send_keys(
        &self,
        session: &Session,
        element: &ElementRef,
        text: &str,
    ) -> Result<(), WebDriverError> {
        self.post(
            &format!("/session/{}/element/{}/value", session.id, element.id),
            &json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    pub async fn clear(&self, session: &Session, element: &ElementRef) -> Result<(), WebDriverError> {
        self.post(
            &format!("/session/{}/element/{}/clear", session.id, element.id),
            &json!({}),
        )
        .await?;
        Ok(())
    }

    /// Execute a script synchronously and return its value.
    pub async fn execute(
        &self,
        session: &Session,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value, WebDriverError> {
        self.post(
            &format!("/session/{}/execute/sync", session.id),
            &json!({ "script": script, "args": args }),
        )
        .await
        .map_err(|e| e.for_operation(WebDriverError::Script))
    }

    /// Capture a screenshot of the current page as raw image bytes.
    pub async fn screenshot(&self, session: &Session) -> Result<Vec<u8>, WebDriverError> {
        let value = self
            .get(&format!("/session/{}/screenshot", session.id))
            .await
            .map_err(|e| e.for_operation(WebDriverError::Screenshot))?;

        let encoded = value.as_str().ok_or_else(|| {
            WebDriverError::Screenshot(format!("screenshot payload is not a string: {}", value))
        })?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| WebDriverError::Screenshot(format!("invalid base64 payload: {}", e)))
    }

    pub async fn page_source(&self, session: &Session) -> Result<String, WebDriverError> {
        let value = self.get(&format!("/session/{}/source", session.id)).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::Protocol(format!("page source is not a string: {}", value)))
    }

    pub async fn current_url(&self, session: &Session) -> Result<String, WebDriverError> {
        let value = self.get(&format!("/session/{}/url", session.id)).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::Protocol(format!("current url is not a string: {}", value)))
    }

    pub async fn title(&self, session: &Session) -> Result<String, WebDriverError> {
        let value = self.get(&format!("/session/{}/title", session.id)).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::Protocol(format!("title is not a string: {}", value)))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, WebDriverError> {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        decode_response(status, &text)
    }

    async fn get(&self, path: &str) -> Result<Value, WebDriverError> {
        let response = self.http.get(format!("{}{}", self.base, path)).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        decode_response(status, &text)
    }

    async fn delete(&self, path: &str) -> Result<Value, WebDriverError> {
        let response = self.http.delete(format!("{}{}", self.base, path)).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        decode_response(status, &text)
    }
}

/// Decode one wire response body into its `value`, mapping protocol error
/// objects onto the uniform error conditions.
fn decode_response(status: u16, body: &str) -> Result<Value, WebDriverError> {
    let parsed: Value = serde_json::from_str(body).map_err(|e| {
        WebDriverError::Protocol(format!("unparseable response ({}): {}", e, truncate(body, 200)))
    })?;

    let value = parsed.get("value").cloned().unwrap_or(Value::Null);

    if status >= 400 || value.get("error").is_some() {
        let code = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(body)
            .to_string();
        return Err(classify_wire_error(code, &message));
    }

    Ok(value)
}

fn classify_wire_error(code: &str, message: &str) -> WebDriverError {
    match code {
        "no such element" | "stale element reference" => {
            WebDriverError::ElementNotFound(format!("{}: {}", code, message))
        }
        "timeout" | "script timeout" => WebDriverError::Timeout(format!("{}: {}", code, message)),
        "javascript error" => WebDriverError::Script(message.to_string()),
        _ => WebDriverError::Protocol(format!("{}: {}", code, message)),
    }
}

fn element_from_value(value: &Value) -> Option<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementRef { id: id.to_string() })
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_session_id() {
        let body = r#"{"value":{"sessionId":"abc123","capabilities":{}}}"#;
        let value = decode_response(200, body).unwrap();
        assert_eq!(value["sessionId"], "abc123");
    }

    #[test]
    fn decodes_element_reference() {
        let body = format!(r#"{{"value":{{"{}":"el-9"}}}}"#, ELEMENT_KEY);
        let value = decode_response(200, &body).unwrap();
        let el = element_from_value(&value).unwrap();
        assert_eq!(el.id, "el-9");
    }

    #[test]
    fn missing_element_is_not_found() {
        let body = r#"{"value":{"error":"no such element","message":"no element for xpath"}}"#;
        let err = decode_response(404, body).unwrap_err();
        assert!(matches!(err, WebDriverError::ElementNotFound(_)));
    }

    #[test]
    fn unknown_error_is_protocol() {
        let body = r#"{"value":{"error":"session not created","message":"boom"}}"#;
        let err = decode_response(500, body).unwrap_err();
        assert!(matches!(err, WebDriverError::Protocol(_)));
    }

    #[test]
    fn garbage_body_is_protocol() {
        let err = decode_response(200, "<html>proxy error</html>").unwrap_err();
        assert!(matches!(err, WebDriverError::Protocol(_)));
    }

    #[test]
    fn script_timeout_is_timeout() {
        let body = r#"{"value":{"error":"script timeout","message":"took too long"}}"#;
        let err = decode_response(500, body).unwrap_err();
        assert!(matches!(err, WebDriverError::Timeout(_)));
    }

    /// Tiny request-at-a-time responder so wire behavior can be tested
    /// without a real automation endpoint.
    async fn serve_one(
        socket: &mut tokio::net::TcpStream,
    ) -> Option<String> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut buf = Vec::new();
        let mut chunk = [0u8; 2048];
        let headers_end = loop {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..headers_end]).to_string();
        let content_length: usize = head
            .lines()
            .find_map(|l| l.to_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse().ok()))
            .flatten()
            .unwrap_or(0);
        while buf.len() < headers_end + content_length {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let path = head.lines().next()?.split(' ').nth(1)?.to_string();
        let (status, body) = if path.ends_with("/click") {
            (
                "500 Internal Server Error",
                r#"{"value":{"error":"element click intercepted","message":"overlay in the way"}}"#,
            )
        } else {
            ("200 OK", r#"{"value":null}"#)
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.ok()?;
        Some(path)
    }

    #[tokio::test]
    async fn native_click_failure_falls_back_to_script_click() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (paths_tx, mut paths_rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                if let Some(path) = serve_one(&mut socket).await {
                    let _ = paths_tx.send(path);
                }
            }
        });

        let client = WebDriverClient::new(WebDriverConfig {
            endpoint: format!("http://127.0.0.1:{}", port),
            request_timeout_seconds: 2,
            headless: true,
            window_width: 800,
            window_height: 600,
        })
        .unwrap();
        let session = Session { id: "s1".into() };
        let element = ElementRef { id: "e1".into() };

        client.click(&session, &element).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(path) = paths_rx.try_recv() {
            seen.push(path);
        }
        assert!(seen.iter().any(|p| p.ends_with("/element/e1/click")), "{:?}", seen);
        assert!(seen.iter().any(|p| p.ends_with("/execute/sync")), "{:?}", seen);
    }
}
