//! Async-friendly browser facade (worker-thread backed)
//!
//! `headless_chrome` drives the DevTools Protocol with blocking calls, so
//! each page session lives on a dedicated worker thread and commands are
//! exchanged over channels. Two captures issued from async tasks therefore
//! overlap their network waits instead of serializing.

use crate::cdp::{CdpBrowser, CdpSession, LaunchConfig};
use crate::{capture, CaptureRequest, Error, Result};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum BrowserCommand {
    NewPage(oneshot::Sender<Result<Page>>),
    Close(oneshot::Sender<()>),
}

enum PageCommand {
    Capture(CaptureRequest, oneshot::Sender<Result<Vec<u8>>>),
}

/// Handle to a running headless browser owned by a background thread.
///
/// The thread owns the browser process and serves page creation; pages are
/// isolated tabs, each driven by its own worker, so captures on different
/// pages run concurrently.
#[derive(Clone)]
pub struct Browser {
    cmd_tx: Sender<BrowserCommand>,
}

/// Handle to one isolated page, backed by its own worker thread.
#[derive(Clone)]
pub struct Page {
    cmd_tx: Sender<PageCommand>,
}

impl Browser {
    /// Launch a browser (spawns a background thread that owns the process).
    pub async fn launch(config: LaunchConfig) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<BrowserCommand>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            // Launch on the worker thread
            let browser = match CdpBrowser::launch(&config) {
                Ok(b) => b,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };

            let _ = init_tx.send(Ok(()));

            // Command loop
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BrowserCommand::NewPage(resp) => {
                        let _ = resp.send(browser.new_session().map(Page::spawn));
                    }
                    BrowserCommand::Close(resp) => {
                        let _ = resp.send(());
                        break;
                    }
                }
            }
            // Dropping the browser here reaps the Chrome process.
        });

        let init_res = init_rx
            .await
            .map_err(|e| Error::Other(format!("Browser worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Open an isolated page for one capture sequence.
    pub async fn new_page(&self) -> Result<Page> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(BrowserCommand::NewPage(tx));
        rx.await
            .map_err(|e| Error::Other(format!("NewPage canceled: {}", e)))?
    }

    /// Shut down the background worker and the browser process.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(BrowserCommand::Close(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?;
        Ok(())
    }
}

impl Page {
    fn spawn(session: CdpSession) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PageCommand>();

        thread::spawn(move || {
            let mut session = session;
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    PageCommand::Capture(request, resp) => {
                        let _ = resp.send(capture(&mut session, &request));
                    }
                }
            }
        });

        Self { cmd_tx }
    }

    /// Capture a screenshot according to `request`.
    pub async fn capture(&self, request: CaptureRequest) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(PageCommand::Capture(request, tx));
        rx.await
            .map_err(|e| Error::Other(format!("Capture canceled: {}", e)))?
    }
}
