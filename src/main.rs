use std::sync::Arc;

use clap::Parser;
use git_history::cli::args::Args;
use git_history::config::Config;
use git_history::git::{GitCli, VcsQuery};
use git_history::history::{
    channel, restore, AppendSchedule, DisplayMessage, DisplayState, HistoryApp, HistoryHost,
    HostOptions, ListRenderer, SnapshotStore,
};
use git_history::infrastructure::logging::parse_level;
use git_history::infrastructure::{setup_logging, LogFormat, LogOutput, LoggingConfig};
use git_history::workspace::TerminalEnvironment;
use tracing::Level;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    config.update_from_args(&args);
    config.validate()?;

    // 界面占用终端，交互模式下日志写入文件
    let output = if args.print {
        LogOutput::Stderr
    } else {
        LogOutput::File(config.log_file.clone())
    };
    setup_logging(LoggingConfig {
        level: parse_level(&config.log_level).unwrap_or(Level::INFO),
        format: LogFormat::parse(&config.log_format).unwrap_or(LogFormat::Compact),
        output,
    })?;

    let folders = args.workspace_folders();
    let (env, notices) = TerminalEnvironment::new(folders.clone());
    let vcs: Arc<dyn VcsQuery> = Arc::new(GitCli::new(config.git_binary.clone()));
    let options = HostOptions {
        scan_depth: config.scan_depth,
        log_limit: config.max_commits,
        preferred_branch: args.branch.clone(),
    };

    let (mut host, mut initial) = HistoryHost::activate(Arc::new(env), vcs, options)
        .await
        .map_err(|e| {
            if e.is_terminal() {
                tracing::error!(error = %e, "activation aborted");
            }
            anyhow::anyhow!(e.user_message())
        })?;

    if let Some(text) = &args.search {
        host.dispatch(DisplayMessage::Search { text: text.clone() })
            .await;
        initial.commits = host.session().visible_commits();
        initial.search_text = text.clone();
    }

    if args.print {
        let update = host.session().full_update(initial.error.clone());
        println!("{}", serde_json::to_string_pretty(&update)?);
        return Ok(());
    }

    let store = SnapshotStore::new(config.snapshot_dir.clone());
    let key = SnapshotStore::key_for(&folders);
    let mut snapshot = if args.fresh { None } else { store.load(&key) };
    if args.search.is_some() {
        // 命令行指定的搜索优先于快照
        if let Some(saved) = snapshot.as_mut() {
            saved.search_text = None;
            saved.commits = None;
            saved.selected_row = None;
        }
    }

    let restored = restore(snapshot.as_ref(), initial);
    let sync = host.reconcile(&restored.initial).await;
    let mut display = DisplayState::new(
        restored,
        ListRenderer::new(config.page_size, config.scroll_threshold),
        AppendSchedule::new(config.scroll_settle()),
    );
    for message in sync {
        display.apply(message);
    }

    let (host_endpoint, display_endpoint) = channel();
    let host_task = tokio::spawn(host.run(host_endpoint));

    let app = HistoryApp::new(display, display_endpoint, notices);
    let saved = app.run().await?;

    if let Err(e) = store.save(&key, &saved) {
        tracing::warn!(error = %e, "failed to save snapshot");
    }

    match host_task.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "host task panicked"),
    }

    tracing::info!("git-history exited");
    Ok(())
}
