// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Turning raw command line values into a validated configuration.

use {
    crate::{
        config::ConfigLayer,
        error::PilotError,
        options::{OptionKey, OptionSchema, OptionSpec, OptionValue, ValueType},
        prompt::Prompt,
    },
    log::{debug, warn},
    serde::Serialize,
    serde_json::Value,
    std::{collections::BTreeMap, path::Path},
};

/// An option value as it appeared on the command line or in a config source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RawValue {
    Text(String),
    Flag(bool),
    List(Vec<String>),
}

impl RawValue {
    fn describe(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Flag(b) => b.to_string(),
            Self::List(l) => l.join(","),
        }
    }

    /// Convert a configuration value for an option of type `ty`.
    ///
    /// Scalars only keep their own type when the option is boolean; string
    /// options receive their textual form.
    fn from_layer(key: OptionKey, ty: ValueType, value: &Value) -> Result<Self, PilotError> {
        match value {
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Bool(b) if ty == ValueType::Bool => Ok(Self::Flag(*b)),
            Value::Bool(b) => Ok(Self::Text(b.to_string())),
            Value::Number(n) => Ok(Self::Text(n.to_string())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(PilotError::TypeCoercion {
                        key,
                        value: other.to_string(),
                        expected: "list element",
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            other => Err(PilotError::TypeCoercion {
                key,
                value: other.to_string(),
                expected: "scalar value",
            }),
        }
    }
}

/// Raw flag values of one invocation.
pub type RawFlags = BTreeMap<OptionKey, RawValue>;

/// Where a value the command can't run without may come from, besides the
/// usual option sources.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IdentifierFallback {
    /// The option receiving the identifier.
    pub key: OptionKey,
    /// Message shown when asking the operator for it.
    pub prompt: &'static str,
}

/// Validated option values for one invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ResolvedConfiguration {
    values: BTreeMap<OptionKey, OptionValue>,
}

impl ResolvedConfiguration {
    pub fn get(&self, key: OptionKey) -> Option<&OptionValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: OptionKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn string(&self, key: OptionKey) -> Option<&str> {
        match self.values.get(&key) {
            Some(OptionValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Value of a boolean option. Unset means `false`.
    pub fn flag(&self, key: OptionKey) -> bool {
        matches!(self.values.get(&key), Some(OptionValue::Bool(true)))
    }

    pub fn integer(&self, key: OptionKey) -> Option<i64> {
        match self.values.get(&key) {
            Some(OptionValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn path(&self, key: OptionKey) -> Option<&Path> {
        match self.values.get(&key) {
            Some(OptionValue::Path(p)) => Some(p),
            _ => None,
        }
    }

    pub fn list(&self, key: OptionKey) -> &[String] {
        match self.values.get(&key) {
            Some(OptionValue::StringList(v)) => v,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Coerce a raw value into the declared type of an option.
pub fn coerce(key: OptionKey, ty: ValueType, raw: &RawValue) -> Result<OptionValue, PilotError> {
    let mismatch = || PilotError::TypeCoercion {
        key,
        value: raw.describe(),
        expected: ty.as_str(),
    };

    match (ty, raw) {
        (ValueType::String, RawValue::Text(s)) => Ok(OptionValue::String(s.clone())),
        (ValueType::Path, RawValue::Text(s)) if !s.is_empty() => Ok(OptionValue::Path(s.into())),
        (ValueType::Bool, RawValue::Flag(b)) => Ok(OptionValue::Bool(*b)),
        (ValueType::Bool, RawValue::Text(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(OptionValue::Bool(true)),
            "false" | "no" | "0" => Ok(OptionValue::Bool(false)),
            _ => Err(mismatch()),
        },
        (ValueType::Integer, RawValue::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(OptionValue::Integer)
            .map_err(|_| mismatch()),
        (ValueType::StringList, RawValue::Text(s)) => Ok(OptionValue::StringList(
            s.split(',')
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect(),
        )),
        (ValueType::StringList, RawValue::List(items)) => {
            Ok(OptionValue::StringList(items.clone()))
        }
        _ => Err(mismatch()),
    }
}

fn validate(spec: &OptionSpec, value: &OptionValue) -> Result<(), PilotError> {
    if let Some(validator) = spec.validator {
        validator(value).map_err(|reason| PilotError::Validation {
            key: spec.key,
            value: value.to_string(),
            reason,
        })?;
    }

    Ok(())
}

/// Builds [ResolvedConfiguration] instances.
pub struct Resolver<'a> {
    schema: &'a OptionSchema,
    layer: &'a ConfigLayer,
    prompt: &'a dyn Prompt,
}

impl<'a> Resolver<'a> {
    pub fn new(schema: &'a OptionSchema, layer: &'a ConfigLayer, prompt: &'a dyn Prompt) -> Self {
        Self {
            schema,
            layer,
            prompt,
        }
    }

    /// Resolve every option in the schema.
    pub fn resolve(
        &self,
        flags: &RawFlags,
        positional: &[String],
    ) -> Result<ResolvedConfiguration, PilotError> {
        let keys = self.schema.all().iter().map(|spec| spec.key).collect::<Vec<_>>();

        self.resolve_scoped(flags, positional, &keys, None)
    }

    /// Resolve the options named by `scope`.
    ///
    /// When `identifier` is set, its option is filled from the first positional
    /// argument and then the prompt if no other source supplied it.
    pub fn resolve_scoped(
        &self,
        flags: &RawFlags,
        positional: &[String],
        scope: &[OptionKey],
        identifier: Option<&IdentifierFallback>,
    ) -> Result<ResolvedConfiguration, PilotError> {
        for key in flags.keys() {
            if !scope.contains(key) {
                warn!("ignoring --{}: not used by this command", key.flag_name());
            }
        }

        let mut values = BTreeMap::new();

        for spec in self.schema.all().iter().filter(|s| scope.contains(&s.key)) {
            let fallback = identifier.filter(|id| id.key == spec.key);

            let mut value = self.lookup(spec, flags)?;

            if value.is_none() {
                if let Some(arg) = fallback.and_then(|_| positional.first()) {
                    debug!("using positional argument for {}", spec.key);
                    value = Some(coerce(spec.key, spec.value_type, &RawValue::Text(arg.clone()))?);
                }
            }

            if value.is_none() && (spec.required || fallback.is_some()) {
                let message = fallback
                    .map(|id| id.prompt.to_string())
                    .unwrap_or_else(|| format!("{}: ", spec.description));

                value = self
                    .prompt
                    .prompt(&message)
                    .map(|answer| coerce(spec.key, spec.value_type, &RawValue::Text(answer)))
                    .transpose()?;
            }

            match value {
                Some(value) => {
                    validate(spec, &value)?;
                    values.insert(spec.key, value);
                }
                None if spec.required || fallback.is_some() => {
                    return Err(PilotError::MissingRequiredOption(spec.key));
                }
                None => {}
            }
        }

        Ok(ResolvedConfiguration { values })
    }

    /// Find a value from flags, then config sources, then the declared default.
    fn lookup(&self, spec: &OptionSpec, flags: &RawFlags) -> Result<Option<OptionValue>, PilotError> {
        if let Some(raw) = flags.get(&spec.key) {
            return coerce(spec.key, spec.value_type, raw).map(Some);
        }

        if let Some(value) = self.layer.get(spec.key) {
            debug!("{} provided by configuration", spec.key);
            let raw = RawValue::from_layer(spec.key, spec.value_type, value)?;
            return coerce(spec.key, spec.value_type, &raw).map(Some);
        }

        Ok(spec.default.clone())
    }
}
