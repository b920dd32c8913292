// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Checking for newer releases around a command.

use {
    crate::error::PilotError,
    log::{debug, warn},
    reqwest::blocking::{Client, ClientBuilder},
    semver::Version,
    serde::Deserialize,
    std::{cell::RefCell, time::Duration},
};

/// Environment variable disabling the update check.
pub const SKIP_UPDATE_CHECK_ENV: &str = "PILOT_SKIP_UPDATE_CHECK";

/// Hook invoked around every command.
pub trait UpdateCheck {
    /// Called before the command runs.
    fn start(&self) -> Result<(), PilotError>;

    /// Called after the command ran, whatever its outcome.
    fn show_status(&self) -> Result<(), PilotError>;
}

/// Does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoUpdateCheck;

impl UpdateCheck for NoUpdateCheck {
    fn start(&self) -> Result<(), PilotError> {
        Ok(())
    }

    fn show_status(&self) -> Result<(), PilotError> {
        Ok(())
    }
}

#[derive(Deserialize)]
struct CrateResponse {
    #[serde(rename = "crate")]
    krate: CrateInfo,
}

#[derive(Deserialize)]
struct CrateInfo {
    max_stable_version: Option<String>,
}

/// Looks up the newest published version on crates.io.
pub struct CratesIoUpdateCheck {
    client: Client,
    crate_name: &'static str,
    current: Version,
    latest: RefCell<Option<Version>>,
}

impl CratesIoUpdateCheck {
    pub fn new(crate_name: &'static str, current: &str) -> Result<Self, PilotError> {
        let current = Version::parse(current)?;
        let client = ClientBuilder::default()
            .user_agent(format!("{crate_name}/{current}"))
            .timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            client,
            crate_name,
            current,
            latest: RefCell::new(None),
        })
    }

    /// The newest version found by [UpdateCheck::start()], if any.
    pub fn latest(&self) -> Option<Version> {
        self.latest.borrow().clone()
    }
}

impl UpdateCheck for CratesIoUpdateCheck {
    fn start(&self) -> Result<(), PilotError> {
        let url = format!("https://crates.io/api/v1/crates/{}", self.crate_name);
        debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json::<CrateResponse>()?;

        if let Some(version) = response.krate.max_stable_version {
            *self.latest.borrow_mut() = Some(Version::parse(&version)?);
        }

        Ok(())
    }

    fn show_status(&self) -> Result<(), PilotError> {
        if let Some(latest) = newer_version(&self.current, self.latest().as_ref()) {
            warn!(
                "{} {} is available, you are using {}",
                self.crate_name, latest, self.current
            );
        }

        Ok(())
    }
}

fn newer_version<'a>(current: &Version, latest: Option<&'a Version>) -> Option<&'a Version> {
    latest.filter(|latest| *latest > current)
}

/// Run `f` between the two halves of an update check.
///
/// Update check failures are logged and otherwise ignored.
pub fn with_update_check<T>(check: &dyn UpdateCheck, f: impl FnOnce() -> T) -> T {
    if let Err(err) = check.start() {
        debug!("update check failed: {err}");
    }

    let res = f();

    if let Err(err) = check.show_status() {
        debug!("update check failed: {err}");
    }

    res
}

#[cfg(test)]
mod test {
    use {super::*, std::cell::Cell};

    #[derive(Default)]
    struct Broken {
        calls: Cell<usize>,
    }

    impl UpdateCheck for Broken {
        fn start(&self) -> Result<(), PilotError> {
            self.calls.set(self.calls.get() + 1);
            Err(PilotError::UnknownCommand("start".into()))
        }

        fn show_status(&self) -> Result<(), PilotError> {
            self.calls.set(self.calls.get() + 1);
            Err(PilotError::UnknownCommand("show_status".into()))
        }
    }

    #[test]
    fn failures_are_swallowed() {
        let check = Broken::default();

        assert_eq!(with_update_check(&check, || 42), 42);
        assert_eq!(check.calls.get(), 2);
    }

    #[test]
    fn status_shown_after_failure() {
        let check = Broken::default();

        let res: Result<(), &str> = with_update_check(&check, || Err("command failed"));
        assert!(res.is_err());
        assert_eq!(check.calls.get(), 2);
    }

    #[test]
    fn newer_versions() {
        let current = Version::parse("0.2.0").unwrap();
        let older = Version::parse("0.1.9").unwrap();
        let newer = Version::parse("0.10.0").unwrap();

        assert_eq!(newer_version(&current, None), None);
        assert_eq!(newer_version(&current, Some(&older)), None);
        assert_eq!(newer_version(&current, Some(&current)), None);
        assert_eq!(newer_version(&current, Some(&newer)), Some(&newer));
    }

    #[test]
    fn parse_response() {
        let response = serde_json::from_str::<CrateResponse>(
            r#"{"crate": {"name": "apple-testflight", "max_stable_version": "1.2.3"}}"#,
        )
        .unwrap();

        assert_eq!(response.krate.max_stable_version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn invalid_current_version() {
        assert!(CratesIoUpdateCheck::new("apple-testflight", "not a version").is_err());
    }
}
