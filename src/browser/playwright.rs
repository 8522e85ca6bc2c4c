use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::{BrowserLauncher, BrowserSession, LaunchProfile};
use crate::error::{AppError, Result};

/// One JSON command per stdin line, one `{"ok":..,"value"|"error":..}` line back.
const DRIVER_JS: &str = r#"
const readline = require('readline');

let pw = null;
try { pw = require('playwright'); } catch (_) {}

let context = null;
let page = null;

function reply(obj) { process.stdout.write(JSON.stringify(obj) + '\n'); }

async function handle(req) {
  if (!pw) {
    throw new Error('Playwright is not installed for Node.js. Run `npm i -g playwright` and `npx playwright install chromium`.');
  }
  switch (req.cmd) {
    case 'launch': {
      context = await pw.chromium.launchPersistentContext(req.profile_dir, {
        headless: !!req.headless,
        slowMo: req.slow_mo_ms,
        userAgent: req.user_agent,
        viewport: { width: req.viewport.width, height: req.viewport.height },
        locale: req.locale,
        timezoneId: req.timezone,
      });
      const pages = context.pages();
      page = pages.length > 0 ? pages[0] : await context.newPage();
      return null;
    }
    case 'navigate':
      await page.goto(req.url, { timeout: req.timeout_ms });
      return null;
    case 'scroll':
      await page.mouse.wheel(0, req.dy);
      return null;
    case 'text':
      return await page.innerText('body');
    case 'title':
      return await page.title();
    case 'close':
      if (context) await context.close();
      context = null;
      page = null;
      return null;
    default:
      throw new Error('unknown command: ' + req.cmd);
  }
}

(async () => {
  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let req;
    try { req = JSON.parse(line); } catch (_) { reply({ ok: false, error: 'bad JSON command' }); continue; }
    try {
      const value = await handle(req);
      reply({ ok: true, value: value === undefined ? null : value });
    } catch (e) {
      reply({ ok: false, error: String(e && e.message ? e.message : e) });
    }
    if (req.cmd === 'close') break;
  }
  if (context) { try { await context.close(); } catch (_) {} }
  process.exit(0);
})();
"#;

/// Upper bound for commands that have no timeout of their own.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct PlaywrightLauncher {
    node_bin: String,
}

impl PlaywrightLauncher {
    pub fn new(node_bin: impl Into<String>) -> Self {
        PlaywrightLauncher {
            node_bin: node_bin.into(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self, profile: &LaunchProfile) -> Result<Box<dyn BrowserSession>> {
        tokio::fs::create_dir_all(&profile.profile_dir).await.map_err(|e| {
            AppError::ExtractionError(format!("cannot create browser profile directory: {}", e))
        })?;

        let mut child = Command::new(&self.node_bin)
            .arg("-e")
            .arg(DRIVER_JS)
            .kill_on_drop(true)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                AppError::ExtractionError(format!(
                    "Playwright backend requires Node.js (`{}`) and the playwright npm package: {}",
                    self.node_bin, e
                ))
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            let _ = child.kill().await;
            return Err(AppError::ExtractionError("Playwright driver pipes unavailable".to_string()));
        };

        let mut session = PlaywrightSession {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            unanswered: 0,
        };

        let launch = json!({
            "cmd": "launch",
            "profile_dir": profile.profile_dir.to_string_lossy(),
            "headless": profile.headless,
            "slow_mo_ms": profile.slow_mo.as_millis() as u64,
            "user_agent": profile.fingerprint.user_agent,
            "viewport": { "width": profile.fingerprint.viewport.width, "height": profile.fingerprint.viewport.height },
            "locale": profile.fingerprint.locale,
            "timezone": profile.fingerprint.timezone,
        });
        if let Err(e) = session.call(launch, COMMAND_TIMEOUT).await {
            session.shutdown().await;
            return Err(e);
        }
        debug!(profile = %profile.profile_dir.display(), "browser launched");
        Ok(Box::new(session))
    }
}

struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// Commands written whose reply has not been read, e.g. after a caller gave up waiting.
    unanswered: usize,
}

impl PlaywrightSession {
    async fn call(&mut self, command: Value, timeout: Duration) -> Result<Value> {
        let cmd = command["cmd"].as_str().unwrap_or("?").to_string();
        let mut line = command.to_string();
        line.push('\n');

        let answer = match tokio::time::timeout(timeout, self.exchange(&line)).await {
            Ok(Ok(Some(answer))) => answer,
            Ok(Ok(None)) => {
                return Err(AppError::ExtractionError(format!("browser driver exited during `{}`", cmd)));
            }
            Ok(Err(e)) => {
                return Err(AppError::ExtractionError(format!("browser driver I/O failed during `{}`: {}", cmd, e)));
            }
            Err(_) => {
                return Err(AppError::ExtractionError(format!(
                    "`{}` timed out after {}ms",
                    cmd,
                    timeout.as_millis()
                )));
            }
        };

        let reply: Value = serde_json::from_str(&answer).map_err(|e| {
            AppError::ExtractionError(format!("browser driver returned invalid JSON: {}", e))
        })?;
        if reply.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(reply.get("value").cloned().unwrap_or(Value::Null))
        } else {
            let message = reply
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("browser command failed");
            Err(AppError::ExtractionError(message.to_string()))
        }
    }

    /// Writes `line` and reads the next reply, discarding replies to abandoned commands first.
    async fn exchange(&mut self, line: &str) -> std::io::Result<Option<String>> {
        // Replies arrive in command order.
        while self.unanswered > 0 {
            match self.stdout.next_line().await? {
                Some(stale) => {
                    debug!(reply = %stale, "discarding reply to an abandoned command");
                    self.unanswered -= 1;
                }
                None => return Ok(None),
            }
        }
        self.stdin.write_all(line.as_bytes()).await?;
        self.unanswered += 1;
        self.stdin.flush().await?;
        let answer = self.stdout.next_line().await?;
        if answer.is_some() {
            self.unanswered -= 1;
        }
        Ok(answer)
    }

    async fn call_for_text(&mut self, command: Value) -> Result<String> {
        let value = self.call(command, COMMAND_TIMEOUT).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Waits for the driver to exit, killing it if it does not.
    async fn shutdown(&mut self) {
        let _ = self.stdin.shutdown().await;
        match tokio::time::timeout(CLOSE_TIMEOUT, self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                warn!("browser driver did not exit, killing it");
                let _ = self.child.kill().await;
            }
        }
    }
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let command = json!({ "cmd": "navigate", "url": url, "timeout_ms": timeout.as_millis() as u64 });
        // The driver enforces `timeout`; the extra slack only catches a wedged driver.
        self.call(command, timeout + Duration::from_secs(5)).await?;
        Ok(())
    }

    async fn scroll(&mut self, dy: i32) -> Result<()> {
        self.call(json!({ "cmd": "scroll", "dy": dy }), COMMAND_TIMEOUT).await?;
        Ok(())
    }

    async fn read_visible_text(&mut self) -> Result<String> {
        self.call_for_text(json!({ "cmd": "text" })).await
    }

    async fn title(&mut self) -> Result<String> {
        self.call_for_text(json!({ "cmd": "title" })).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut session = self;
        let result = session.call(json!({ "cmd": "close" }), CLOSE_TIMEOUT).await;
        session.shutdown().await;
        result.map(|_| ())
    }
}
