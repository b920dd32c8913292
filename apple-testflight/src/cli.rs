// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use {
    crate::{
        commands::pilot_router,
        config::ConfigBuilder,
        error::PilotError,
        managers::{DryRunManager, Managers},
        prompt::TerminalPrompt,
        router::{Context, ExitStatus, GlobalArgs},
        update_check::{
            with_update_check, CratesIoUpdateCheck, NoUpdateCheck, UpdateCheck,
            SKIP_UPDATE_CHECK_ENV,
        },
    },
    log::{debug, LevelFilter},
};

/// Assemble the configuration sources selected by global flags.
pub fn config_builder(globals: &GlobalArgs) -> ConfigBuilder {
    let mut config = ConfigBuilder::default();

    config = if globals.config_path.is_empty() {
        config.with_user_config_file().with_cwd_config_file()
    } else {
        for path in &globals.config_path {
            if path.display().to_string() == "/dev/null" {
                break;
            }

            config = config.toml_file(path);
        }

        config
    };

    if let Some(profile) = &globals.profile {
        config = config.profile(profile.to_string());
    }

    // Environment variables override everything but flags.
    config.with_env_prefix()
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    if log_level == LevelFilter::Info {
        builder
            .filter_module("rustls", LevelFilter::Error)
            .filter_module("reqwest", LevelFilter::Error);
    }

    builder.init();
}

fn update_check() -> Box<dyn UpdateCheck> {
    if std::env::var_os(SKIP_UPDATE_CHECK_ENV).is_some() {
        return Box::new(NoUpdateCheck);
    }

    match CratesIoUpdateCheck::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")) {
        Ok(check) => Box::new(check),
        Err(err) => {
            debug!("update check unavailable: {err}");
            Box::new(NoUpdateCheck)
        }
    }
}

pub fn main_impl() -> Result<ExitStatus, PilotError> {
    let router = pilot_router()?;

    let (globals, invocation) = match router.parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => {
            err.print()?;

            return Ok(if err.exit_code() == 0 {
                ExitStatus::Success
            } else {
                ExitStatus::Usage
            });
        }
    };

    init_logging(globals.verbose);

    let context = Context {
        verbosity: globals.verbose,
        layer: config_builder(&globals).layer()?,
        prompt: Box::new(TerminalPrompt),
        managers: Managers::uniform(DryRunManager::new(
            router.schema().clone(),
            globals.verbose,
        )),
    };

    let check = update_check();

    Ok(with_update_check(check.as_ref(), || {
        router.dispatch(&context, &invocation)
    }))
}

#[cfg(test)]
mod test {
    use {super::*, crate::options::OptionKey, serde_json::json, std::io::Write};

    #[test]
    fn dev_null_stops_loading() -> Result<(), PilotError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rpilot.toml");
        writeln!(std::fs::File::create(&path)?, "[default]\nteam_id = \"ABC\"")?;

        let globals = GlobalArgs {
            config_path: vec!["/dev/null".into(), path.clone()],
            ..Default::default()
        };
        let layer = config_builder(&globals).layer()?;
        assert_eq!(layer.get(OptionKey::TeamId), None);

        let globals = GlobalArgs {
            config_path: vec![path],
            ..Default::default()
        };
        let layer = config_builder(&globals).layer()?;
        assert_eq!(layer.get(OptionKey::TeamId), Some(&json!("ABC")));

        Ok(())
    }

    #[test]
    fn profile_selection() -> Result<(), PilotError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rpilot.toml");
        writeln!(
            std::fs::File::create(&path)?,
            "[default]\nteam_id = \"ABC\"\n\n[ci]\nteam_id = \"CI\""
        )?;

        let globals = GlobalArgs {
            config_path: vec![path],
            profile: Some("ci".into()),
            ..Default::default()
        };
        let layer = config_builder(&globals).layer()?;
        assert_eq!(layer.get(OptionKey::TeamId), Some(&json!("CI")));

        Ok(())
    }
}
