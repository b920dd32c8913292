// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The TestFlight verbs.

use {
    crate::{
        error::PilotError,
        options::{OptionKey as K, OptionSchema},
        resolver::{IdentifierFallback, ResolvedConfiguration},
        router::{CommandDescriptor, Context, Router},
    },
    log::info,
};

pub const PROGRAM_NAME: &str = "rpilot";

pub const DESCRIPTION: &str =
    "The best way to manage your TestFlight testers and builds from your terminal";

const EMAIL_FALLBACK: IdentifierFallback = IdentifierFallback {
    key: K::Email,
    prompt: "Email address of the tester: ",
};

const UPLOAD_OPTIONS: &[K] = &[
    K::Username,
    K::AppIdentifier,
    K::AppPlatform,
    K::Ipa,
    K::Changelog,
    K::BetaAppDescription,
    K::BetaAppFeedbackEmail,
    K::SkipSubmission,
    K::SkipWaitingForBuildProcessing,
    K::UpdateBuildInfoOnUpload,
    K::DistributeExternal,
    K::WaitProcessingInterval,
    K::Groups,
    K::TeamId,
    K::TeamName,
    K::ItcProvider,
];

const BUILDS_OPTIONS: &[K] = &[
    K::Username,
    K::AppIdentifier,
    K::AppPlatform,
    K::AppleId,
    K::TeamId,
    K::TeamName,
];

const ADD_OPTIONS: &[K] = &[
    K::Username,
    K::AppIdentifier,
    K::AppleId,
    K::Email,
    K::FirstName,
    K::LastName,
    K::Groups,
    K::TeamId,
    K::TeamName,
];

const LIST_OPTIONS: &[K] = &[
    K::Username,
    K::AppIdentifier,
    K::AppleId,
    K::TeamId,
    K::TeamName,
];

const FIND_OPTIONS: &[K] = &[
    K::Username,
    K::AppIdentifier,
    K::Email,
    K::TeamId,
    K::TeamName,
];

const REMOVE_OPTIONS: &[K] = &[
    K::Username,
    K::AppIdentifier,
    K::Email,
    K::Groups,
    K::TeamId,
    K::TeamName,
];

const EXPORT_OPTIONS: &[K] = &[
    K::Username,
    K::AppIdentifier,
    K::AppleId,
    K::TestersFilePath,
    K::TeamId,
    K::TeamName,
];

const IMPORT_OPTIONS: &[K] = &[
    K::Username,
    K::AppIdentifier,
    K::AppleId,
    K::TestersFilePath,
    K::Groups,
    K::TeamId,
    K::TeamName,
];

/// Descriptors for every TestFlight verb, in help order.
pub fn pilot_commands() -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor {
            verb: "upload",
            syntax: "rpilot upload",
            description: "Uploads a new binary to Apple TestFlight",
            options: UPLOAD_OPTIONS,
            identifier: None,
            handler: upload,
        },
        CommandDescriptor {
            verb: "builds",
            syntax: "rpilot builds",
            description: "Lists all builds for given application",
            options: BUILDS_OPTIONS,
            identifier: None,
            handler: builds,
        },
        CommandDescriptor {
            verb: "add",
            syntax: "rpilot add [email]",
            description: "Adds a new external tester to a specific app (if given). \
                This will also add an existing tester to an app.",
            options: ADD_OPTIONS,
            identifier: Some(EMAIL_FALLBACK),
            handler: add,
        },
        CommandDescriptor {
            verb: "list",
            syntax: "rpilot list",
            description: "Lists all registered testers, both internal and external",
            options: LIST_OPTIONS,
            identifier: None,
            handler: list,
        },
        CommandDescriptor {
            verb: "find",
            syntax: "rpilot find [email]",
            description: "Find a tester (internal or external) by their email address",
            options: FIND_OPTIONS,
            identifier: Some(EMAIL_FALLBACK),
            handler: find,
        },
        CommandDescriptor {
            verb: "remove",
            syntax: "rpilot remove [email]",
            description: "Remove an external tester by their email address",
            options: REMOVE_OPTIONS,
            identifier: Some(EMAIL_FALLBACK),
            handler: remove,
        },
        CommandDescriptor {
            verb: "export",
            syntax: "rpilot export",
            description: "Exports all external testers to a CSV file",
            options: EXPORT_OPTIONS,
            identifier: None,
            handler: export,
        },
        CommandDescriptor {
            verb: "import",
            syntax: "rpilot import",
            description: "Create external testers from a CSV file",
            options: IMPORT_OPTIONS,
            identifier: None,
            handler: import,
        },
    ]
}

/// Construct the router for the TestFlight verbs.
pub fn pilot_router() -> Result<Router, PilotError> {
    Router::builder(PROGRAM_NAME, OptionSchema::pilot()?)
        .version(env!("CARGO_PKG_VERSION"))
        .about(DESCRIPTION)
        .commands(pilot_commands())
        .build()
}

fn upload(context: &Context, config: &ResolvedConfiguration, _: &[String]) -> Result<(), PilotError> {
    if let Some(ipa) = config.path(K::Ipa) {
        info!("uploading {}", ipa.display());
    }

    Ok(context.managers.builds.upload(config)?)
}

fn builds(context: &Context, config: &ResolvedConfiguration, _: &[String]) -> Result<(), PilotError> {
    Ok(context.managers.builds.list(config)?)
}

fn add(context: &Context, config: &ResolvedConfiguration, _: &[String]) -> Result<(), PilotError> {
    Ok(context.managers.testers.add_tester(config)?)
}

fn list(context: &Context, config: &ResolvedConfiguration, _: &[String]) -> Result<(), PilotError> {
    Ok(context.managers.testers.list_testers(config)?)
}

fn find(context: &Context, config: &ResolvedConfiguration, _: &[String]) -> Result<(), PilotError> {
    Ok(context.managers.testers.find_tester(config)?)
}

fn remove(context: &Context, config: &ResolvedConfiguration, _: &[String]) -> Result<(), PilotError> {
    Ok(context.managers.testers.remove_tester(config)?)
}

fn export(context: &Context, config: &ResolvedConfiguration, _: &[String]) -> Result<(), PilotError> {
    info!(
        "exporting testers to {}",
        config
            .path(K::TestersFilePath)
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    );

    Ok(context.managers.exporter.export_testers(config)?)
}

fn import(context: &Context, config: &ResolvedConfiguration, _: &[String]) -> Result<(), PilotError> {
    Ok(context.managers.importer.import_testers(config)?)
}
