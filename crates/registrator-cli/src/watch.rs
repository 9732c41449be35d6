//! Config-directory watcher
//!
//! Raw `notify` events are translated into [`FileAction`]s by [`classify`];
//! filtering down to definition files happens in the daemon, which knows the
//! Bridge's filter.

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// What the Bridge should do about one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    Add(PathBuf),
    Remove(PathBuf),
    Change(PathBuf),
}

impl FileAction {
    pub fn path(&self) -> &Path {
        match self {
            Self::Add(path) | Self::Remove(path) | Self::Change(path) => path,
        }
    }
}

/// Map one filesystem event to Bridge actions, in event path order.
///
/// `exists` resolves ambiguous renames, where the platform does not say
/// which side of the rename a path is on.
pub fn classify(event: &Event, exists: impl Fn(&Path) -> bool) -> Vec<FileAction> {
    let paths = event.paths.iter().cloned();
    match event.kind {
        EventKind::Create(_) => paths.map(FileAction::Add).collect(),
        EventKind::Remove(_) => paths.map(FileAction::Remove).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.map(FileAction::Remove).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => paths.map(FileAction::Add).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![FileAction::Remove(from.clone()), FileAction::Add(to.clone())],
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .map(|path| {
                if exists(&path) {
                    FileAction::Add(path)
                } else {
                    FileAction::Remove(path)
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
            paths.map(FileAction::Change).collect()
        }
        _ => Vec::new(),
    }
}

/// Recursive watcher forwarding events into a tokio channel.
pub struct DirWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl DirWatcher {
    pub fn new(root: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Next event from the backend; `None` once the watcher is gone.
    pub async fn next_event(&mut self) -> Option<notify::Result<Event>> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    fn add(path: &str) -> FileAction {
        FileAction::Add(PathBuf::from(path))
    }

    fn remove(path: &str) -> FileAction {
        FileAction::Remove(PathBuf::from(path))
    }

    fn change(path: &str) -> FileAction {
        FileAction::Change(PathBuf::from(path))
    }

    #[rstest]
    #[case(EventKind::Create(CreateKind::File), vec![add("/d/a.json")])]
    #[case(EventKind::Remove(RemoveKind::File), vec![remove("/d/a.json")])]
    #[case(EventKind::Modify(ModifyKind::Name(RenameMode::From)), vec![remove("/d/a.json")])]
    #[case(EventKind::Modify(ModifyKind::Name(RenameMode::To)), vec![add("/d/a.json")])]
    #[case(EventKind::Modify(ModifyKind::Data(DataChange::Content)), vec![change("/d/a.json")])]
    #[case(EventKind::Modify(ModifyKind::Any), vec![change("/d/a.json")])]
    #[case(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)), vec![])]
    #[case(EventKind::Access(notify::event::AccessKind::Any), vec![])]
    fn single_path_events(#[case] kind: EventKind, #[case] expected: Vec<FileAction>) {
        let actions = classify(&event(kind, &["/d/a.json"]), |_| true);
        assert_eq!(actions, expected);
    }

    #[test]
    fn rename_both_removes_then_adds() {
        let actions = classify(
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/d/old.json", "/d/new.json"],
            ),
            |_| panic!("not consulted"),
        );
        assert_eq!(actions, vec![remove("/d/old.json"), add("/d/new.json")]);
    }

    #[rstest]
    #[case(true, add("/d/a.json"))]
    #[case(false, remove("/d/a.json"))]
    fn ambiguous_rename_uses_existence(#[case] exists: bool, #[case] expected: FileAction) {
        let actions = classify(
            &event(EventKind::Modify(ModifyKind::Name(RenameMode::Any)), &["/d/a.json"]),
            |_| exists,
        );
        assert_eq!(actions, vec![expected]);
    }

    #[test]
    fn action_path() {
        assert_eq!(change("/d/a.json").path(), Path::new("/d/a.json"));
    }
}
