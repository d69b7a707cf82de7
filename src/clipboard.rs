use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn copy(&self, text: &str) -> Result<()>;
}

/// Pipes text into the first platform clipboard tool that accepts it.
pub struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn copy(&self, text: &str) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let candidates: &[(&str, &[&str])] = if cfg!(target_os = "macos") {
            &[("pbcopy", &[])]
        } else if cfg!(target_os = "windows") {
            &[("clip.exe", &[])]
        } else {
            // WSL first, then Wayland, then X11
            &[
                ("clip.exe", &[]),
                ("wl-copy", &[]),
                ("xclip", &["-selection", "clipboard"]),
            ]
        };

        for (cmd, args) in candidates {
            let child = tokio::process::Command::new(cmd)
                .args(*args)
                .stdin(std::process::Stdio::piped())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .spawn();

            let Ok(mut child) = child else {
                continue;
            };
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    tracing::debug!("{cmd}: write failed: {e}");
                }
                drop(stdin);
            }
            if child.wait().await?.success() {
                tracing::debug!("copied {} bytes via {cmd}", text.len());
                return Ok(());
            }
        }

        Err(eyre!(
            "No clipboard tool found. Install xclip, wl-copy, or use WSL with clip.exe"
        ))
    }
}
