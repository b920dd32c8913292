// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Declarations of every option the tool understands.

use {
    crate::error::PilotError,
    serde::Serialize,
    std::{
        fmt::{Display, Formatter},
        path::PathBuf,
    },
};

/// Identifies a configurable option.
///
/// The set is closed: a [crate::resolver::ResolvedConfiguration] can only ever
/// be keyed by one of these.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKey {
    Username,
    AppIdentifier,
    AppPlatform,
    AppleId,
    Ipa,
    Changelog,
    BetaAppDescription,
    BetaAppFeedbackEmail,
    SkipSubmission,
    SkipWaitingForBuildProcessing,
    UpdateBuildInfoOnUpload,
    DistributeExternal,
    WaitProcessingInterval,
    FirstName,
    LastName,
    Email,
    TestersFilePath,
    Groups,
    TeamId,
    TeamName,
    ItcProvider,
}

impl OptionKey {
    /// Name used in configuration files and (upper-cased) environment variables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::AppIdentifier => "app_identifier",
            Self::AppPlatform => "app_platform",
            Self::AppleId => "apple_id",
            Self::Ipa => "ipa",
            Self::Changelog => "changelog",
            Self::BetaAppDescription => "beta_app_description",
            Self::BetaAppFeedbackEmail => "beta_app_feedback_email",
            Self::SkipSubmission => "skip_submission",
            Self::SkipWaitingForBuildProcessing => "skip_waiting_for_build_processing",
            Self::UpdateBuildInfoOnUpload => "update_build_info_on_upload",
            Self::DistributeExternal => "distribute_external",
            Self::WaitProcessingInterval => "wait_processing_interval",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::TestersFilePath => "testers_file_path",
            Self::Groups => "groups",
            Self::TeamId => "team_id",
            Self::TeamName => "team_name",
            Self::ItcProvider => "itc_provider",
        }
    }

    /// Name of the long command line flag, without leading dashes.
    pub fn flag_name(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::AppIdentifier => "app-identifier",
            Self::AppPlatform => "app-platform",
            Self::AppleId => "apple-id",
            Self::Ipa => "ipa",
            Self::Changelog => "changelog",
            Self::BetaAppDescription => "beta-app-description",
            Self::BetaAppFeedbackEmail => "beta-app-feedback-email",
            Self::SkipSubmission => "skip-submission",
            Self::SkipWaitingForBuildProcessing => "skip-waiting-for-build-processing",
            Self::UpdateBuildInfoOnUpload => "update-build-info-on-upload",
            Self::DistributeExternal => "distribute-external",
            Self::WaitProcessingInterval => "wait-processing-interval",
            Self::FirstName => "first-name",
            Self::LastName => "last-name",
            Self::Email => "email",
            Self::TestersFilePath => "testers-file-path",
            Self::Groups => "groups",
            Self::TeamId => "team-id",
            Self::TeamName => "team-name",
            Self::ItcProvider => "itc-provider",
        }
    }
}

impl Display for OptionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type an option's value is coerced into.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueType {
    String,
    Bool,
    Integer,
    Path,
    StringList,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "boolean",
            Self::Integer => "integer",
            Self::Path => "path",
            Self::StringList => "comma separated list",
        }
    }
}

/// A typed option value.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Path(PathBuf),
    StringList(Vec<String>),
}

impl OptionValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Bool(_) => ValueType::Bool,
            Self::Integer(_) => ValueType::Integer,
            Self::Path(_) => ValueType::Path,
            Self::StringList(_) => ValueType::StringList,
        }
    }
}

impl Display for OptionValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Path(v) => write!(f, "{}", v.display()),
            Self::StringList(v) => f.write_str(&v.join(",")),
        }
    }
}

/// Checks a coerced value, returning a human readable reason on rejection.
pub type Validator = fn(&OptionValue) -> Result<(), String>;

/// Static definition of one option.
#[derive(Clone)]
pub struct OptionSpec {
    pub key: OptionKey,
    pub value_type: ValueType,
    pub default: Option<OptionValue>,
    pub required: bool,
    pub validator: Option<Validator>,
    pub short: Option<char>,
    pub description: &'static str,
}

impl std::fmt::Debug for OptionSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionSpec")
            .field("key", &self.key)
            .field("value_type", &self.value_type)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("validator", &self.validator.is_some())
            .field("short", &self.short)
            .finish()
    }
}

impl OptionSpec {
    /// Define an optional option with no default, short flag or validator.
    pub fn new(key: OptionKey, value_type: ValueType, description: &'static str) -> Self {
        Self {
            key,
            value_type,
            default: None,
            required: false,
            validator: None,
            short: None,
            description,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: OptionValue) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }
}

/// The ordered set of registered options.
#[derive(Clone, Debug, Default)]
pub struct OptionSchema {
    specs: Vec<OptionSpec>,
}

impl OptionSchema {
    /// Add an option definition.
    pub fn register(&mut self, spec: OptionSpec) -> Result<(), PilotError> {
        if self.get(spec.key).is_some() {
            return Err(PilotError::DuplicateKey(spec.key));
        }

        self.specs.push(spec);
        Ok(())
    }

    /// All registered options, in registration order.
    pub fn all(&self) -> &[OptionSpec] {
        &self.specs
    }

    pub fn get(&self, key: OptionKey) -> Option<&OptionSpec> {
        self.specs.iter().find(|spec| spec.key == key)
    }

    /// Construct the schema for the TestFlight commands.
    pub fn pilot() -> Result<Self, PilotError> {
        let mut schema = Self::default();

        for spec in pilot_options() {
            schema.register(spec)?;
        }

        Ok(schema)
    }
}

fn pilot_options() -> Vec<OptionSpec> {
    use {OptionKey as K, ValueType as T};

    vec![
        OptionSpec::new(K::Username, T::String, "Your Apple ID Username").short('u'),
        OptionSpec::new(
            K::AppIdentifier,
            T::String,
            "The bundle identifier of the app to upload or manage testers (optional)",
        )
        .short('a'),
        OptionSpec::new(
            K::AppPlatform,
            T::String,
            "The platform to use (optional): ios, appletvos or osx",
        )
        .default_value(OptionValue::String("ios".into()))
        .validator(validate_platform),
        OptionSpec::new(
            K::AppleId,
            T::String,
            "The unique App ID provided by App Store Connect",
        )
        .validator(validate_apple_id),
        OptionSpec::new(K::Ipa, T::Path, "Path to the ipa file to upload")
            .short('i')
            .validator(validate_ipa),
        OptionSpec::new(
            K::Changelog,
            T::String,
            "Provide the 'What to Test' text when uploading a new build",
        ),
        OptionSpec::new(
            K::BetaAppDescription,
            T::String,
            "Provide the 'Beta App Description' when uploading a new build",
        ),
        OptionSpec::new(
            K::BetaAppFeedbackEmail,
            T::String,
            "Provide the beta app email when uploading a new build",
        )
        .validator(validate_email),
        OptionSpec::new(
            K::SkipSubmission,
            T::Bool,
            "Skip the distributing action and only upload the ipa file",
        )
        .default_value(OptionValue::Bool(false)),
        OptionSpec::new(
            K::SkipWaitingForBuildProcessing,
            T::Bool,
            "Don't wait for the build to process",
        )
        .default_value(OptionValue::Bool(false)),
        OptionSpec::new(
            K::UpdateBuildInfoOnUpload,
            T::Bool,
            "Update build info immediately after validation",
        )
        .default_value(OptionValue::Bool(false)),
        OptionSpec::new(
            K::DistributeExternal,
            T::Bool,
            "Should the build be distributed to external testers?",
        )
        .default_value(OptionValue::Bool(false)),
        OptionSpec::new(
            K::WaitProcessingInterval,
            T::Integer,
            "Interval in seconds to wait for App Store Connect processing",
        )
        .default_value(OptionValue::Integer(30))
        .validator(validate_positive),
        OptionSpec::new(
            K::FirstName,
            T::String,
            "The tester's first name",
        ),
        OptionSpec::new(K::LastName, T::String, "The tester's last name"),
        OptionSpec::new(K::Email, T::String, "The tester's email").validator(validate_email),
        OptionSpec::new(
            K::TestersFilePath,
            T::Path,
            "Path to a CSV file of testers",
        )
        .default_value(OptionValue::Path("./testers.csv".into())),
        OptionSpec::new(
            K::Groups,
            T::StringList,
            "Associate tester to one group or more by group name / group id",
        ),
        OptionSpec::new(
            K::TeamId,
            T::String,
            "The ID of your App Store Connect team if you're in multiple teams",
        ),
        OptionSpec::new(
            K::TeamName,
            T::String,
            "The name of your App Store Connect team if you're in multiple teams",
        ),
        OptionSpec::new(
            K::ItcProvider,
            T::String,
            "The provider short name to be used with the iTMSTransporter",
        ),
    ]
}

fn validate_platform(value: &OptionValue) -> Result<(), String> {
    match value {
        OptionValue::String(s) if ["ios", "appletvos", "osx"].contains(&s.as_str()) => Ok(()),
        _ => Err("must be one of ios, appletvos or osx".into()),
    }
}

fn validate_apple_id(value: &OptionValue) -> Result<(), String> {
    match value {
        OptionValue::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => Ok(()),
        _ => Err("must be the numeric App ID".into()),
    }
}

fn validate_email(value: &OptionValue) -> Result<(), String> {
    match value {
        OptionValue::String(s) if s.contains('@') => Ok(()),
        _ => Err("not an email address".into()),
    }
}

fn validate_ipa(value: &OptionValue) -> Result<(), String> {
    match value {
        OptionValue::Path(p) => {
            if p.extension().and_then(|e| e.to_str()) != Some("ipa") {
                Err("file must have an .ipa extension".into())
            } else if !p.exists() {
                Err("file does not exist".into())
            } else {
                Ok(())
            }
        }
        _ => Err("must be a path".into()),
    }
}

fn validate_positive(value: &OptionValue) -> Result<(), String> {
    match value {
        OptionValue::Integer(v) if *v > 0 => Ok(()),
        _ => Err("must be greater than 0".into()),
    }
}
