//! 提交历史视图：宿主、显示层以及两者之间的命令通道

pub mod app;
pub mod channel;
pub mod display;
pub mod filter;
pub mod host;
pub mod renderer;
pub mod session;
pub mod snapshot;
pub mod view;

pub use app::HistoryApp;
pub use channel::{channel, DisplayEndpoint, DisplayMessage, HostEndpoint, HostMessage};
pub use display::{DisplayState, FilesEntry};
pub use filter::filter_commits;
pub use host::{FetchJob, FetchOutcome, HistoryHost, HostOptions, Step, REPO_PICK_PLACEHOLDER};
pub use renderer::{AppendSchedule, CommitRow, ListRenderer, RenderPhase};
pub use session::{FetchSlot, RequestToken, SessionState};
pub use snapshot::{restore, DisplaySnapshot, InitialState, RestoredState, SnapshotStore};
