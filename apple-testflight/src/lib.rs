// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Command line front-end for TestFlight beta testing workflows.
//!
//! An invocation names a verb (`upload`, `add`, ...). The [router::Router]
//! looks the verb up, the [resolver::Resolver] turns flags, configuration
//! files, environment variables, defaults and operator answers into a
//! [resolver::ResolvedConfiguration], and the command's handler hands that
//! configuration to one of the [managers].

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod managers;
pub mod options;
pub mod prompt;
pub mod resolver;
pub mod router;
pub mod update_check;

pub use crate::{
    error::PilotError,
    options::{OptionKey, OptionSchema, OptionSpec, OptionValue, ValueType},
    resolver::{RawValue, ResolvedConfiguration, Resolver},
    router::{CommandDescriptor, Context, ExitStatus, RawInvocation, Router},
};
