// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Mapping verbs to command handlers.

use {
    crate::{
        config::ConfigLayer,
        error::PilotError,
        managers::Managers,
        options::{OptionKey, OptionSchema, OptionSpec, ValueType},
        prompt::Prompt,
        resolver::{IdentifierFallback, RawFlags, RawValue, ResolvedConfiguration, Resolver},
    },
    clap::{
        builder::BoolishValueParser, parser::ValueSource, Arg, ArgAction, ArgMatches, Args,
        FromArgMatches,
    },
    log::{debug, trace},
    std::{
        ffi::OsString,
        fmt::{Display, Formatter},
        path::PathBuf,
    },
};

/// Built-in verb printing usage.
pub const HELP_VERB: &str = "help";

const POSITIONAL: &str = "args";

/// Holds state to pass to command handlers.
///
/// Constructed once per process, before dispatch.
pub struct Context {
    /// Logging verbosity requested with `-v`.
    pub verbosity: u8,
    pub layer: ConfigLayer,
    pub prompt: Box<dyn Prompt>,
    pub managers: Managers,
}

/// Runs a command with its resolved configuration and positional arguments.
pub type Handler = fn(&Context, &ResolvedConfiguration, &[String]) -> Result<(), PilotError>;

/// Definition of one verb.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub verb: &'static str,
    pub syntax: &'static str,
    pub description: &'static str,
    /// Options the command accepts.
    pub options: &'static [OptionKey],
    /// Value the command requires that may be given positionally.
    pub identifier: Option<IdentifierFallback>,
    pub handler: Handler,
}

/// Flags accepted regardless of the verb.
#[derive(Args, Clone, Debug, Default, Eq, PartialEq)]
pub struct GlobalArgs {
    /// Explicit configuration file to load.
    ///
    /// If provided, the default configuration files are not loaded. Can be
    /// specified multiple times; later files override earlier ones. The
    /// special value `/dev/null` stops loading further files.
    #[arg(short = 'C', long = "config-file", global = true, value_name = "PATH")]
    pub config_path: Vec<PathBuf>,

    /// Configuration profile to load.
    #[arg(short = 'P', long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Increase logging verbosity. Can be specified multiple times
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// The parsed but not yet resolved command line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawInvocation {
    /// `None` when no verb was given.
    pub verb: Option<String>,
    pub positional: Vec<String>,
    pub flags: RawFlags,
}

impl RawInvocation {
    pub fn new(verb: impl ToString) -> Self {
        Self {
            verb: Some(verb.to_string()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn flag(mut self, key: OptionKey, value: RawValue) -> Self {
        self.flags.insert(key, value);
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.positional.push(arg.to_string());
        self
    }
}

/// Outcome of a dispatch, as a process exit status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitStatus {
    Success,
    /// Resolution or the command itself failed.
    Failure,
    /// The command line could not be understood.
    Usage,
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Usage => 2,
        }
    }
}

/// Progress of one invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Idle,
    ParsingArgs,
    ResolvingConfig,
    Dispatching,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::ParsingArgs)
                | (Self::ParsingArgs, Self::ResolvingConfig)
                | (Self::ParsingArgs, Self::Succeeded)
                | (Self::ParsingArgs, Self::Failed)
                | (Self::ResolvingConfig, Self::Dispatching)
                | (Self::ResolvingConfig, Self::Failed)
                | (Self::Dispatching, Self::Succeeded)
                | (Self::Dispatching, Self::Failed)
        )
    }

    #[must_use]
    fn advance(self, next: Phase) -> Phase {
        debug_assert!(self.can_advance_to(next), "{self} -> {next}");
        trace!("invocation phase {self} -> {next}");
        next
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::ParsingArgs => "parsing arguments",
            Self::ResolvingConfig => "resolving configuration",
            Self::Dispatching => "dispatching",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        })
    }
}

/// Used to instantiate [Router] instances.
pub struct RouterBuilder {
    name: &'static str,
    version: &'static str,
    about: &'static str,
    schema: OptionSchema,
    commands: Vec<CommandDescriptor>,
}

impl RouterBuilder {
    pub fn version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    pub fn about(mut self, about: &'static str) -> Self {
        self.about = about;
        self
    }

    pub fn command(mut self, command: CommandDescriptor) -> Self {
        self.commands.push(command);
        self
    }

    pub fn commands(mut self, commands: impl IntoIterator<Item = CommandDescriptor>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Build the router, failing on duplicate verbs.
    pub fn build(self) -> Result<Router, PilotError> {
        let mut router = Router {
            name: self.name,
            version: self.version,
            about: self.about,
            schema: self.schema,
            commands: vec![],
        };

        for command in self.commands {
            router.register(command)?;
        }

        Ok(router)
    }
}

/// The dispatch table.
pub struct Router {
    name: &'static str,
    version: &'static str,
    about: &'static str,
    schema: OptionSchema,
    commands: Vec<CommandDescriptor>,
}

impl Router {
    pub fn builder(name: &'static str, schema: OptionSchema) -> RouterBuilder {
        RouterBuilder {
            name,
            version: "",
            about: "",
            schema,
            commands: vec![],
        }
    }

    /// Add a verb to the dispatch table.
    pub fn register(&mut self, command: CommandDescriptor) -> Result<(), PilotError> {
        if command.verb == HELP_VERB || self.find(command.verb).is_some() {
            return Err(PilotError::DuplicateVerb(command.verb.to_string()));
        }

        self.commands.push(command);
        Ok(())
    }

    pub fn find(&self, verb: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|c| c.verb == verb)
    }

    pub fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    pub fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn scoped_specs<'a>(
        &'a self,
        command: &'a CommandDescriptor,
    ) -> impl Iterator<Item = &'a OptionSpec> + 'a {
        self.schema
            .all()
            .iter()
            .filter(move |spec| command.options.contains(&spec.key))
    }

    /// Obtain the argument parser for the dispatch table.
    pub fn clap_command(&self) -> clap::Command {
        let mut app = clap::Command::new(self.name)
            .version(self.version)
            .about(self.about)
            .override_help(self.render_help())
            .disable_help_subcommand(true)
            .allow_external_subcommands(true)
            .external_subcommand_value_parser(clap::value_parser!(String));

        app = GlobalArgs::augment_args(app);

        for command in &self.commands {
            let mut sub = clap::Command::new(command.verb)
                .about(command.description)
                .override_usage(command.syntax);

            for spec in self.scoped_specs(command) {
                sub = sub.arg(spec_arg(spec));
            }

            sub = sub.arg(
                Arg::new(POSITIONAL)
                    .value_name("ARGS")
                    .action(ArgAction::Append)
                    .num_args(0..)
                    .help("Positional arguments"),
            );

            app = app.subcommand(sub);
        }

        app
    }

    /// Parse an argument vector, including the program name.
    pub fn parse_from<I, T>(&self, argv: I) -> Result<(GlobalArgs, RawInvocation), clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.clap_command().try_get_matches_from(argv)?;
        let globals = GlobalArgs::from_arg_matches(&matches)?;

        let invocation = match matches.subcommand() {
            None => RawInvocation::default(),
            Some((verb, sub)) => match self.find(verb) {
                Some(command) => RawInvocation {
                    verb: Some(verb.to_string()),
                    positional: strings(sub, POSITIONAL),
                    flags: self
                        .scoped_specs(command)
                        .filter_map(|spec| raw_flag(sub, spec).map(|raw| (spec.key, raw)))
                        .collect(),
                },
                // Unknown verbs are reported by dispatch.
                None => RawInvocation {
                    verb: Some(verb.to_string()),
                    positional: strings(sub, ""),
                    flags: RawFlags::new(),
                },
            },
        };

        debug!("parsed invocation: {invocation:?}");

        Ok((globals, invocation))
    }

    /// Resolve the configuration of an invocation and run its handler.
    pub fn dispatch(&self, context: &Context, invocation: &RawInvocation) -> ExitStatus {
        let (phase, status) = self.run(context, invocation);
        debug!("invocation {phase} with exit status {}", status.code());

        status
    }

    /// Like [Self::dispatch()], also returning the phase the invocation ended in.
    fn run(&self, context: &Context, invocation: &RawInvocation) -> (Phase, ExitStatus) {
        let phase = Phase::Idle.advance(Phase::ParsingArgs);

        let verb = match invocation.verb.as_deref() {
            None | Some(HELP_VERB) => {
                print!("{}", self.render_help());
                return (phase.advance(Phase::Succeeded), ExitStatus::Success);
            }
            Some(verb) => verb,
        };

        let command = match self.find(verb) {
            Some(command) => command,
            None => {
                eprintln!("Error: {}", PilotError::UnknownCommand(verb.to_string()));
                eprint!("{}", self.render_help());
                return (phase.advance(Phase::Failed), ExitStatus::Usage);
            }
        };

        let phase = phase.advance(Phase::ResolvingConfig);

        let resolver = Resolver::new(&self.schema, &context.layer, context.prompt.as_ref());
        let config = match resolver.resolve_scoped(
            &invocation.flags,
            &invocation.positional,
            command.options,
            command.identifier.as_ref(),
        ) {
            Ok(config) => config,
            Err(err) => return fail(verb, phase, err),
        };

        let phase = phase.advance(Phase::Dispatching);
        debug!("running {verb} with {} options", config.len());

        match (command.handler)(context, &config, &invocation.positional) {
            Ok(()) => (phase.advance(Phase::Succeeded), ExitStatus::Success),
            Err(err) => fail(verb, phase, err),
        }
    }

    /// Usage text listing every verb and option.
    pub fn render_help(&self) -> String {
        let mut out = format!("{} {}\n{}\n\nCommands:\n", self.name, self.version, self.about);

        let syntax_width = self
            .commands
            .iter()
            .map(|c| c.syntax.len())
            .max()
            .unwrap_or_default();

        for command in &self.commands {
            out.push_str(&format!(
                "  {: <width$}  {}\n",
                command.syntax,
                command.description,
                width = syntax_width
            ));
        }
        out.push_str(&format!(
            "  {: <width$}  Show this message\n",
            format!("{} {}", self.name, HELP_VERB),
            width = syntax_width
        ));

        out.push_str("\nOptions:\n");
        for spec in self.schema.all() {
            let mut help = spec.description.to_string();
            if spec.value_type != ValueType::String {
                help.push_str(&format!(" ({})", spec.value_type.as_str()));
            }
            if let Some(default) = &spec.default {
                help.push_str(&format!(" [default: {default}]"));
            }
            if spec.required {
                help.push_str(" [required]");
            }
            out.push_str(&option_line(spec.short, spec.key.flag_name(), &help));
        }

        out.push_str("\nGlobal options:\n");
        let globals = GlobalArgs::augment_args(clap::Command::new(self.name));
        for arg in globals.get_arguments().filter(|arg| !arg.is_hide_set()) {
            let Some(long) = arg.get_long() else {
                continue;
            };

            let mut flag = long.to_string();
            if arg.get_action().takes_values() {
                for name in arg.get_value_names().unwrap_or_default() {
                    flag.push_str(&format!(" <{name}>"));
                }
            }

            let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
            out.push_str(&option_line(arg.get_short(), &flag, &help));
        }

        out
    }
}

fn option_line(short: Option<char>, long: &str, help: &str) -> String {
    let short = short
        .map(|c| format!("-{c}, "))
        .unwrap_or_else(|| "    ".into());

    format!("  {short}--{long: <34} {help}\n")
}

fn fail(verb: &str, phase: Phase, err: PilotError) -> (Phase, ExitStatus) {
    debug!("{verb} failed while {phase}");
    eprintln!("Error: {err}");

    (phase.advance(Phase::Failed), ExitStatus::Failure)
}

fn spec_arg(spec: &OptionSpec) -> Arg {
    let mut arg = Arg::new(spec.key.as_str())
        .long(spec.key.flag_name())
        .help(spec.description);

    if let Some(short) = spec.short {
        arg = arg.short(short);
    }

    match spec.value_type {
        // `--flag` or `--flag=false`, so a configured `true` can be overridden.
        ValueType::Bool => arg
            .action(ArgAction::Set)
            .value_name("BOOL")
            .value_parser(BoolishValueParser::new())
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        ValueType::String => arg.action(ArgAction::Set).value_name("STRING"),
        ValueType::Integer => arg.action(ArgAction::Set).value_name("INT"),
        ValueType::Path => arg.action(ArgAction::Set).value_name("PATH"),
        ValueType::StringList => arg.action(ArgAction::Set).value_name("LIST"),
    }
}

fn raw_flag(matches: &ArgMatches, spec: &OptionSpec) -> Option<RawValue> {
    let id = spec.key.as_str();

    if matches.value_source(id) != Some(ValueSource::CommandLine) {
        return None;
    }

    match spec.value_type {
        ValueType::Bool => matches.get_one::<bool>(id).copied().map(RawValue::Flag),
        _ => matches.get_one::<String>(id).cloned().map(RawValue::Text),
    }
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{managers::test::RecordingManager, prompt::NonInteractive},
    };

    fn succeed(_: &Context, _: &ResolvedConfiguration, _: &[String]) -> Result<(), PilotError> {
        Ok(())
    }

    fn descriptor(verb: &'static str) -> CommandDescriptor {
        CommandDescriptor {
            verb,
            syntax: "test",
            description: "test command",
            options: &[OptionKey::Email, OptionKey::SkipSubmission],
            identifier: None,
            handler: succeed,
        }
    }

    fn schema() -> OptionSchema {
        let mut schema = OptionSchema::default();
        schema
            .register(OptionSpec::new(OptionKey::Email, ValueType::String, "email").short('e'))
            .unwrap();
        schema
            .register(OptionSpec::new(
                OptionKey::SkipSubmission,
                ValueType::Bool,
                "skip",
            ))
            .unwrap();
        schema
    }

    fn context() -> Context {
        Context {
            verbosity: 0,
            layer: ConfigLayer::default(),
            prompt: Box::new(NonInteractive),
            managers: Managers::uniform(RecordingManager::default()),
        }
    }

    #[test]
    fn duplicate_verb() {
        let err = Router::builder("t", schema())
            .command(descriptor("add"))
            .command(descriptor("add"))
            .build()
            .err()
            .unwrap();

        assert!(matches!(err, PilotError::DuplicateVerb(verb) if verb == "add"));
    }

    #[test]
    fn help_verb_reserved() {
        let mut router = Router::builder("t", schema()).build().unwrap();

        assert!(router.register(descriptor(HELP_VERB)).is_err());
        assert!(router.register(descriptor("add")).is_ok());
    }

    #[test]
    fn verify_cli() {
        Router::builder("t", schema())
            .version("1.0")
            .command(descriptor("add"))
            .command(descriptor("list"))
            .build()
            .unwrap()
            .clap_command()
            .debug_assert();
    }

    #[test]
    fn parse_flags() {
        let router = Router::builder("t", schema())
            .command(descriptor("add"))
            .build()
            .unwrap();

        let (globals, invocation) = router
            .parse_from(["t", "-vv", "add", "--skip-submission", "-e", "a@b.c", "x"])
            .unwrap();

        assert_eq!(globals.verbose, 2);
        assert_eq!(
            invocation,
            RawInvocation::new("add")
                .flag(OptionKey::Email, RawValue::Text("a@b.c".into()))
                .flag(OptionKey::SkipSubmission, RawValue::Flag(true))
                .arg("x")
        );
    }

    #[test]
    fn parse_bool_values() {
        let router = Router::builder("t", schema())
            .command(descriptor("add"))
            .build()
            .unwrap();

        let (_, invocation) = router
            .parse_from(["t", "add", "--skip-submission=false", "x"])
            .unwrap();
        assert_eq!(
            invocation,
            RawInvocation::new("add")
                .flag(OptionKey::SkipSubmission, RawValue::Flag(false))
                .arg("x")
        );

        let (_, invocation) = router
            .parse_from(["t", "add", "--skip-submission", "x"])
            .unwrap();
        assert_eq!(
            invocation.flags.get(&OptionKey::SkipSubmission),
            Some(&RawValue::Flag(true))
        );
        assert_eq!(invocation.positional, ["x"]);

        assert!(router
            .parse_from(["t", "add", "--skip-submission=perhaps"])
            .is_err());
    }

    #[test]
    fn parse_absent_flags() {
        let router = Router::builder("t", schema())
            .command(descriptor("add"))
            .build()
            .unwrap();

        let (_, invocation) = router.parse_from(["t", "add"]).unwrap();
        assert!(invocation.flags.is_empty());
        assert!(invocation.positional.is_empty());
    }

    #[test]
    fn parse_unknown_verb() {
        let router = Router::builder("t", schema())
            .command(descriptor("add"))
            .build()
            .unwrap();

        let (_, invocation) = router.parse_from(["t", "bogus", "x"]).unwrap();
        assert_eq!(invocation, RawInvocation::new("bogus").arg("x"));

        let (globals, invocation) = router.parse_from(["t", "-P", "ci"]).unwrap();
        assert_eq!(globals.profile.as_deref(), Some("ci"));
        assert_eq!(invocation.verb, None);
    }

    #[test]
    fn parse_rejects_unscoped_flag() {
        let router = Router::builder("t", schema())
            .command(CommandDescriptor {
                options: &[OptionKey::Email],
                ..descriptor("find")
            })
            .build()
            .unwrap();

        assert!(router
            .parse_from(["t", "find", "--skip-submission"])
            .is_err());
    }

    #[test]
    fn dispatch_statuses() {
        let router = Router::builder("t", schema())
            .command(descriptor("add"))
            .build()
            .unwrap();
        let context = context();

        assert_eq!(
            router.dispatch(&context, &RawInvocation::default()),
            ExitStatus::Success
        );
        assert_eq!(
            router.dispatch(&context, &RawInvocation::new(HELP_VERB)),
            ExitStatus::Success
        );
        assert_eq!(
            router.dispatch(&context, &RawInvocation::new("bogus")),
            ExitStatus::Usage
        );
        assert_eq!(
            router.dispatch(&context, &RawInvocation::new("add")),
            ExitStatus::Success
        );
        assert_eq!(
            router.dispatch(
                &context,
                &RawInvocation::new("add").flag(OptionKey::SkipSubmission, RawValue::Text("maybe".into()))
            ),
            ExitStatus::Failure
        );
    }

    #[test]
    fn dispatch_ends_in_terminal_phase() {
        let router = Router::builder("t", schema())
            .command(descriptor("add"))
            .build()
            .unwrap();
        let context = context();

        assert_eq!(
            router.run(&context, &RawInvocation::default()),
            (Phase::Succeeded, ExitStatus::Success)
        );
        assert_eq!(
            router.run(&context, &RawInvocation::new("bogus")),
            (Phase::Failed, ExitStatus::Usage)
        );
        assert_eq!(
            router.run(&context, &RawInvocation::new("add")),
            (Phase::Succeeded, ExitStatus::Success)
        );
        assert_eq!(
            router.run(
                &context,
                &RawInvocation::new("add").flag(OptionKey::Email, RawValue::Flag(true))
            ),
            (Phase::Failed, ExitStatus::Failure)
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_ne!(ExitStatus::Failure.code(), 0);
        assert_ne!(ExitStatus::Usage.code(), 0);
    }

    #[test]
    fn phases_forward_only() {
        assert!(Phase::Idle.can_advance_to(Phase::ParsingArgs));
        assert!(Phase::ResolvingConfig.can_advance_to(Phase::Failed));
        assert!(!Phase::Dispatching.can_advance_to(Phase::ResolvingConfig));
        assert!(!Phase::Succeeded.can_advance_to(Phase::Failed));
        assert!(!Phase::Idle.can_advance_to(Phase::Dispatching));
    }

    #[test]
    fn help_lists_everything() {
        let router = Router::builder("t", schema())
            .version("1.2.3")
            .about("about text")
            .command(descriptor("add"))
            .build()
            .unwrap();

        let help = router.render_help();
        assert!(help.starts_with("t 1.2.3\nabout text\n"));
        assert!(help.contains("test command"));
        assert!(help.contains("-e, --email"));
        assert!(help.contains("--skip-submission"));
        assert!(help.contains("(boolean)"));
        assert!(help.contains("-C, --config-file <PATH>"));
        assert!(help.contains("-P, --profile <NAME>"));
        assert!(help.contains("-v, --verbose "));
        assert!(!help.contains("--verbose <"));
    }

    #[test]
    fn help_flag_matches_help_verb() {
        let router = Router::builder("t", schema())
            .version("1.2.3")
            .about("about text")
            .command(descriptor("add"))
            .build()
            .unwrap();

        let clap_help = router.clap_command().render_help().to_string();
        assert!(clap_help.starts_with("t 1.2.3\nabout text\n"));
        assert!(clap_help.contains("Global options:"));
        assert!(clap_help.contains("-e, --email"));
    }
}
