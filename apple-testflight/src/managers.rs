// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Interfaces to the components performing TestFlight actions.

use {
    crate::{options::OptionSchema, resolver::ResolvedConfiguration},
    anyhow::Result,
    log::info,
};

/// Uploads and lists builds.
pub trait BuildManager {
    fn upload(&self, config: &ResolvedConfiguration) -> Result<()>;

    fn list(&self, config: &ResolvedConfiguration) -> Result<()>;
}

/// Manages individual testers.
pub trait TesterManager {
    fn add_tester(&self, config: &ResolvedConfiguration) -> Result<()>;

    fn list_testers(&self, config: &ResolvedConfiguration) -> Result<()>;

    fn find_tester(&self, config: &ResolvedConfiguration) -> Result<()>;

    fn remove_tester(&self, config: &ResolvedConfiguration) -> Result<()>;
}

/// Writes external testers to a CSV file.
pub trait TesterExporter {
    fn export_testers(&self, config: &ResolvedConfiguration) -> Result<()>;
}

/// Creates external testers from a CSV file.
pub trait TesterImporter {
    fn import_testers(&self, config: &ResolvedConfiguration) -> Result<()>;
}

/// The set of managers commands are dispatched to.
pub struct Managers {
    pub builds: Box<dyn BuildManager>,
    pub testers: Box<dyn TesterManager>,
    pub exporter: Box<dyn TesterExporter>,
    pub importer: Box<dyn TesterImporter>,
}

impl Managers {
    /// Use a single value for every manager.
    pub fn uniform<M>(manager: M) -> Self
    where
        M: BuildManager + TesterManager + TesterExporter + TesterImporter + Clone + 'static,
    {
        Self {
            builds: Box::new(manager.clone()),
            testers: Box::new(manager.clone()),
            exporter: Box::new(manager.clone()),
            importer: Box::new(manager),
        }
    }
}

/// Prints the action that would be performed instead of contacting App Store Connect.
#[derive(Clone, Debug)]
pub struct DryRunManager {
    schema: OptionSchema,
    verbosity: u8,
}

impl DryRunManager {
    pub fn new(schema: OptionSchema, verbosity: u8) -> Self {
        Self { schema, verbosity }
    }

    fn report(&self, action: &str, config: &ResolvedConfiguration) -> Result<()> {
        info!("dry run: not contacting App Store Connect");
        println!("{action}");
        print_option_header();

        for spec in self.schema.all() {
            match config.get(spec.key) {
                Some(value) => print_option(spec.key.as_str(), &value.to_string()),
                // Unset options are noise unless asked for.
                None if self.verbosity > 0 => print_option(spec.key.as_str(), "-"),
                None => {}
            }
        }

        Ok(())
    }
}

fn print_option_header() {
    println!("{: <35} | {: <30}", "option", "value");
}

fn print_option(name: &str, value: &str) {
    println!("{: <35} | {: <30}", name, value);
}

impl BuildManager for DryRunManager {
    fn upload(&self, config: &ResolvedConfiguration) -> Result<()> {
        self.report("upload build", config)
    }

    fn list(&self, config: &ResolvedConfiguration) -> Result<()> {
        self.report("list builds", config)
    }
}

impl TesterManager for DryRunManager {
    fn add_tester(&self, config: &ResolvedConfiguration) -> Result<()> {
        self.report("add tester", config)
    }

    fn list_testers(&self, config: &ResolvedConfiguration) -> Result<()> {
        self.report("list testers", config)
    }

    fn find_tester(&self, config: &ResolvedConfiguration) -> Result<()> {
        self.report("find tester", config)
    }

    fn remove_tester(&self, config: &ResolvedConfiguration) -> Result<()> {
        self.report("remove tester", config)
    }
}

impl TesterExporter for DryRunManager {
    fn export_testers(&self, config: &ResolvedConfiguration) -> Result<()> {
        self.report("export testers", config)
    }
}

impl TesterImporter for DryRunManager {
    fn import_testers(&self, config: &ResolvedConfiguration) -> Result<()> {
        self.report("import testers", config)
    }
}
