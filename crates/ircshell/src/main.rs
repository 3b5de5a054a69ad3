//! IRC 指令殼層
//!
//! 從標準輸入逐行讀取，交給目前視窗的指令解析器處理，
//! 並將各視窗的輸出以 `[kind] text` 的形式寫到標準輸出。

mod commands;
mod config;
mod session;

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::ShellConfig;
use session::Session;

#[tokio::main]
async fn main() -> io::Result<()> {
    // 初始化日誌（寫到 stderr，避免與輸出混在一起）
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let shell_config = ShellConfig::load();
    let (tx, rx) = mpsc::unbounded_channel();
    let session = Session::new(&shell_config, tx);

    let options_path = ShellConfig::options_path();
    if options_path.exists() {
        if let Err(e) = session.reload_options(&options_path) {
            warn!("無法載入選項: {}", e);
        }
    }

    match session.actions().load_actions(ShellConfig::actions_dir()) {
        Ok(n) => info!("已載入 {} 個動作", n),
        Err(e) => warn!("無法載入動作: {}", e),
    }

    session.connect();

    let stdin = BufReader::new(tokio::io::stdin());
    run(stdin, tokio::io::stdout(), session, rx).await
}

/// 主迴圈：每讀入一行就分派，然後寫出這一行產生的所有輸出
async fn run<R, W>(
    reader: R,
    mut writer: W,
    session: Arc<Session>,
    mut output: mpsc::UnboundedReceiver<String>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    flush_output(&mut output, &mut writer).await?;

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches('\r');
        session.handle_line(line);
        flush_output(&mut output, &mut writer).await?;
    }

    info!("輸入結束");
    Ok(())
}

async fn flush_output<W>(output: &mut mpsc::UnboundedReceiver<String>, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Ok(line) = output.try_recv() {
        writer.write_all(format!("{}\n", line).as_bytes()).await?;
    }
    writer.flush().await
}
