//! Data models for workshop acquisition and update checks
//!
//! These types carry values between the resolver, planner, supervisor and
//! update checker. Everything here is plain data: construction validates the
//! invariants once and the values are not mutated afterwards, except for
//! [`InvocationOutcome`] which is filled in while a SteamCMD run progresses.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::constants::steamcmd;
use crate::errors::{ConfigError, ConfigResult};

/// Returns true for a non-empty string made only of ASCII digits
pub fn is_digit_string(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// One workshop item within one game's namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AcquisitionTarget {
    app_id: String,
    item_id: String,
}

impl AcquisitionTarget {
    /// Create a target, returning `None` unless both ids are digit strings
    pub fn new(app_id: impl Into<String>, item_id: impl Into<String>) -> Option<Self> {
        let app_id = app_id.into();
        let item_id = item_id.into();
        if is_digit_string(&app_id) && is_digit_string(&item_id) {
            Some(Self { app_id, item_id })
        } else {
            None
        }
    }

    /// Owning game's app id
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Workshop item id
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// SteamCMD directive downloading this item
    pub fn download_directive(&self) -> String {
        format!(
            "{} {} {}",
            steamcmd::DOWNLOAD_DIRECTIVE,
            self.app_id,
            self.item_id
        )
    }
}

impl fmt::Display for AcquisitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_id, self.item_id)
    }
}

/// An ordered, non-empty group of targets submitted to one SteamCMD run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    index: usize,
    targets: Vec<AcquisitionTarget>,
}

impl Batch {
    pub(crate) fn new(index: usize, targets: Vec<AcquisitionTarget>) -> Self {
        debug_assert!(!targets.is_empty(), "batches are never empty");
        Self { index, targets }
    }

    /// Position of this batch in the plan, starting at 0
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn targets(&self) -> &[AcquisitionTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// How SteamCMD logs in
#[derive(Clone, PartialEq, Eq, Default)]
pub enum LoginMode {
    #[default]
    Anonymous,
    Credentials { username: String, password: String },
}

impl LoginMode {
    /// Build from optional configured credentials; both must be non-blank
    pub fn from_credentials(username: Option<&str>, password: Option<&str>) -> Self {
        match (username.map(str::trim), password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                LoginMode::Credentials {
                    username: user.to_string(),
                    password: pass.to_string(),
                }
            }
            _ => LoginMode::Anonymous,
        }
    }

    /// The `+login` directive
    pub fn directive(&self) -> String {
        match self {
            LoginMode::Anonymous => steamcmd::LOGIN_ANONYMOUS.to_string(),
            LoginMode::Credentials { username, password } => {
                format!("+login {} {}", username, password)
            }
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, LoginMode::Anonymous)
    }
}

// Keeps passwords out of logs
impl fmt::Debug for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginMode::Anonymous => write!(f, "Anonymous"),
            LoginMode::Credentials { username, .. } => f
                .debug_struct("Credentials")
                .field("username", username)
                .field("password", &"********")
                .finish(),
        }
    }
}

/// Fully assembled argument vector for one SteamCMD run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    executable: PathBuf,
    login: LoginMode,
    batch: Batch,
}

impl ToolInvocation {
    pub(crate) fn new(executable: PathBuf, login: LoginMode, batch: Batch) -> Self {
        Self {
            executable,
            login,
            batch,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn login(&self) -> &LoginMode {
        &self.login
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Arguments passed to the executable, in order
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.batch.len() + 3);
        args.push(self.login.directive());
        args.extend(self.batch.targets().iter().map(|t| t.download_directive()));
        args.push(steamcmd::VALIDATE.to_string());
        args.push(steamcmd::QUIT.to_string());
        args
    }

    /// Executable path followed by [`Self::args`]
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.executable.display().to_string()];
        argv.extend(self.args());
        argv
    }

    /// Command line with the password masked, suitable for logs
    pub fn redacted_command_line(&self) -> String {
        let mut argv = self.argv();
        if let LoginMode::Credentials { username, .. } = &self.login {
            argv[1] = format!("+login {} ********", username);
        }
        argv.join(" ")
    }
}

/// Terminal state of a SteamCMD run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitStatus {
    Success,
    Failure,
    StillRunning,
}

/// Result of running one [`ToolInvocation`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationOutcome {
    pub exit_status: ExitStatus,
    pub captured_output: Vec<String>,
    pub error_line: Option<String>,
    pub exit_code: Option<i32>,
}

impl InvocationOutcome {
    /// Empty outcome for a process that just launched
    pub fn running() -> Self {
        Self {
            exit_status: ExitStatus::StillRunning,
            captured_output: Vec::new(),
            error_line: None,
            exit_code: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == ExitStatus::Success
    }

    pub fn is_finished(&self) -> bool {
        self.exit_status != ExitStatus::StillRunning
    }

    pub(crate) fn push_line(&mut self, line: String) {
        self.captured_output.push(line);
    }

    pub(crate) fn finish_success(&mut self, exit_code: Option<i32>) {
        self.exit_status = ExitStatus::Success;
        self.exit_code = exit_code;
    }

    pub(crate) fn finish_failure(&mut self, exit_code: Option<i32>, error_line: Option<String>) {
        self.exit_status = ExitStatus::Failure;
        self.exit_code = exit_code;
        if error_line.is_some() {
            self.error_line = error_line;
        }
    }
}

/// Metadata scraped from one mod's detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModSnapshot {
    pub name: String,
    pub owner_game: String,
    pub app_id: String,
    pub created_at_epoch: Option<i64>,
    pub updated_at_epoch: Option<i64>,
    pub removed_from_steam: bool,
}

impl ModSnapshot {
    /// Snapshot of an item whose page no longer lists any stats
    pub fn removed(name: String, owner_game: String, app_id: String) -> Self {
        Self {
            name,
            owner_game,
            app_id,
            created_at_epoch: None,
            updated_at_epoch: None,
            removed_from_steam: true,
        }
    }

    /// Snapshot of a live item; `updated_at_epoch` is `None` if never revised
    pub fn published(
        name: String,
        owner_game: String,
        app_id: String,
        created_at_epoch: i64,
        updated_at_epoch: Option<i64>,
    ) -> Self {
        Self {
            name,
            owner_game,
            app_id,
            created_at_epoch: Some(created_at_epoch),
            updated_at_epoch,
            removed_from_steam: false,
        }
    }
}

/// Filesystem view of an installed mod at check time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalInstallState {
    pub item_id: String,
    pub local_path: PathBuf,
    pub local_modified_epoch: Option<i64>,
}

/// Staleness decision for one mod
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateVerdict {
    pub item_id: String,
    pub name: String,
    pub needs_update: bool,
    pub removed_from_steam: bool,
    pub remote_updated_epoch: Option<i64>,
    pub local_modified_epoch: Option<i64>,
}

impl UpdateVerdict {
    /// Stale iff the item is live, has been revised, and the local copy predates the revision
    pub fn evaluate(snapshot: &ModSnapshot, local: &LocalInstallState) -> Self {
        let needs_update = !snapshot.removed_from_steam
            && matches!(
                (local.local_modified_epoch, snapshot.updated_at_epoch),
                (Some(local_epoch), Some(remote_epoch)) if local_epoch < remote_epoch
            );

        Self {
            item_id: local.item_id.clone(),
            name: snapshot.name.clone(),
            needs_update,
            removed_from_steam: snapshot.removed_from_steam,
            remote_updated_epoch: snapshot.updated_at_epoch,
            local_modified_epoch: local.local_modified_epoch,
        }
    }
}

/// A configured game: where its mods live and which app id owns them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    name: String,
    app_id: String,
    mod_folder_path: Option<PathBuf>,
}

impl Game {
    /// Validate and build a game. An empty mod folder path counts as unset.
    pub fn new(
        name: impl Into<String>,
        app_id: impl Into<String>,
        mod_folder_path: Option<PathBuf>,
    ) -> ConfigResult<Self> {
        let name = name.into();
        let app_id = app_id.into();

        if name.trim().is_empty() {
            return Err(ConfigError::NoGameSelected);
        }
        if !is_digit_string(app_id.trim()) {
            return Err(ConfigError::InvalidValue {
                field: format!("games.{}.appid", name),
                value: app_id,
                reason: "App id must be numeric".to_string(),
            });
        }

        Ok(Self {
            name,
            app_id: app_id.trim().to_string(),
            mod_folder_path: mod_folder_path.filter(|p| !p.as_os_str().is_empty()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn mod_folder_path(&self) -> Option<&Path> {
        self.mod_folder_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(app: &str, item: &str) -> AcquisitionTarget {
        AcquisitionTarget::new(app, item).unwrap()
    }

    #[test]
    fn test_target_requires_digits() {
        assert!(AcquisitionTarget::new("10", "111").is_some());
        assert!(AcquisitionTarget::new("", "111").is_none());
        assert!(AcquisitionTarget::new("10", "11a").is_none());
        assert_eq!(target("10", "111"), target("10", "111"));
    }

    #[test]
    fn test_login_directive() {
        assert_eq!(LoginMode::Anonymous.directive(), "+login anonymous");
        let login = LoginMode::from_credentials(Some("alice"), Some("hunter2"));
        assert_eq!(login.directive(), "+login alice hunter2");
        assert!(!format!("{:?}", login).contains("hunter2"));

        // Blank username falls back to anonymous
        let login = LoginMode::from_credentials(Some("  "), Some("hunter2"));
        assert!(login.is_anonymous());
    }

    #[test]
    fn test_invocation_args_layout() {
        let batch = Batch::new(0, vec![target("10", "111"), target("10", "222")]);
        let invocation =
            ToolInvocation::new(PathBuf::from("/opt/steamcmd/steamcmd.sh"), LoginMode::Anonymous, batch);

        assert_eq!(
            invocation.argv(),
            vec![
                "/opt/steamcmd/steamcmd.sh",
                "+login anonymous",
                "+workshop_download_item 10 111",
                "+workshop_download_item 10 222",
                "validate",
                "+quit",
            ]
        );
    }

    #[test]
    fn test_redacted_command_line() {
        let batch = Batch::new(0, vec![target("10", "111")]);
        let login = LoginMode::from_credentials(Some("alice"), Some("hunter2"));
        let invocation = ToolInvocation::new(PathBuf::from("steamcmd"), login, batch);

        let line = invocation.redacted_command_line();
        assert!(line.contains("+login alice ********"));
        assert!(!line.contains("hunter2"));
    }

    #[test]
    fn test_outcome_lifecycle() {
        let mut outcome = InvocationOutcome::running();
        assert!(!outcome.is_finished());

        outcome.push_line("Loading Steam API...OK".to_string());
        outcome.finish_failure(Some(8), Some("ERROR! Timeout".to_string()));

        assert!(outcome.is_finished());
        assert!(!outcome.is_success());
        assert_eq!(outcome.error_line.as_deref(), Some("ERROR! Timeout"));
    }

    #[test]
    fn test_game_validation() {
        assert!(Game::new("RimWorld", "294100", None).is_ok());
        assert!(matches!(
            Game::new("", "294100", None),
            Err(ConfigError::NoGameSelected)
        ));
        assert!(matches!(
            Game::new("RimWorld", "rim", None),
            Err(ConfigError::InvalidValue { .. })
        ));

        let game = Game::new("RimWorld", "294100", Some(PathBuf::new())).unwrap();
        assert!(game.mod_folder_path().is_none());
    }

    fn local(modified: i64) -> LocalInstallState {
        LocalInstallState {
            item_id: "42".to_string(),
            local_path: PathBuf::from("/mods/42"),
            local_modified_epoch: Some(modified),
        }
    }

    fn live(updated: Option<i64>) -> ModSnapshot {
        ModSnapshot::published(
            "Harmony".to_string(),
            "RimWorld".to_string(),
            "294100".to_string(),
            1_000,
            updated,
        )
    }

    #[test]
    fn test_verdict_compares_local_against_remote_update() {
        let remote = Some(2_000);

        assert!(UpdateVerdict::evaluate(&live(remote), &local(1_999)).needs_update);
        assert!(!UpdateVerdict::evaluate(&live(remote), &local(2_000)).needs_update);
        assert!(!UpdateVerdict::evaluate(&live(remote), &local(2_001)).needs_update);
    }

    #[test]
    fn test_verdict_never_updated_or_removed() {
        let never_updated = UpdateVerdict::evaluate(&live(None), &local(0));
        assert!(!never_updated.needs_update);
        assert!(!never_updated.removed_from_steam);

        let removed = ModSnapshot::removed(String::new(), String::new(), String::new());
        let verdict = UpdateVerdict::evaluate(&removed, &local(0));
        assert!(!verdict.needs_update);
        assert!(verdict.removed_from_steam);
        assert_eq!(verdict.item_id, "42");
    }
}
