use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::naming::{fold, to_canonical};
use crate::response::Outcome;

/// Error produced when a request body does not fit a method's input shape.
pub type DecodeError = serde_json::Error;

type Call<S> = Box<dyn Fn(&S, Option<Value>) -> Result<Outcome, DecodeError> + Send + Sync>;
type Handle = Box<dyn Fn(Option<Value>) -> Result<Outcome, DecodeError> + Send + Sync>;

/// Concrete type a method's input is decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    type_name: &'static str,
}

impl InputShape {
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Declared outputs of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outputs {
    /// Returns nothing.
    None,
    /// Returns `Result<(), E>`.
    ErrorOnly,
    /// Returns `Result<T, E>`.
    ValueAndError,
}

impl Outputs {
    /// Number of output values in the `(value, error)` model.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Outputs::None => 0,
            Outputs::ErrorOnly => 1,
            Outputs::ValueAndError => 2,
        }
    }
}

/// One method of a service, not yet bound to a receiver.
///
/// Generated by `#[service]`; can also be written by hand:
///
/// ```rust
/// use rpcgate::{InputShape, MethodDef, Outcome, Outputs, Service};
///
/// pub struct Greeter;
///
/// impl Service for Greeter {
///     fn methods() -> Vec<MethodDef<Self>> {
///         vec![MethodDef::new(
///             "hello",
///             Some(InputShape::of::<String>()),
///             Outputs::ValueAndError,
///             |_svc: &Self, input| {
///                 let name: String = serde_json::from_value(input.unwrap_or_default())?;
///                 Ok(Outcome::success(&format!("hello {name}")))
///             },
///         )]
///     }
/// }
/// ```
pub struct MethodDef<S> {
    name: String,
    input: Option<InputShape>,
    outputs: Outputs,
    call: Call<S>,
}

impl<S> MethodDef<S> {
    /// Describe a method.
    ///
    /// `call` receives the request body only when `input` is `Some`; it must decode
    /// that body itself and classify whatever the method returned.
    pub fn new<F>(name: impl Into<String>, input: Option<InputShape>, outputs: Outputs, call: F) -> Self
    where
        F: Fn(&S, Option<Value>) -> Result<Outcome, DecodeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            input,
            outputs,
            call: Box::new(call),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S> fmt::Debug for MethodDef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// A method that was left out of the registry, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    name: String,
    reason: &'static str,
}

impl Exclusion {
    pub fn new(name: impl Into<String>, reason: &'static str) -> Self {
        Self {
            name: name.into(),
            reason,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// A value whose methods can be dispatched by name.
pub trait Service: Sized + Send + Sync + 'static {
    /// Methods that fit the calling convention.
    fn methods() -> Vec<MethodDef<Self>>;

    /// Methods that were seen but do not fit the calling convention.
    fn exclusions() -> Vec<Exclusion> {
        Vec::new()
    }
}

/// A registered method bound to its receiver.
pub struct MethodDescriptor {
    name: String,
    declared: String,
    input: Option<InputShape>,
    outputs: Outputs,
    handle: Handle,
}

impl MethodDescriptor {
    /// Canonical name, the registry key
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as written in the service (or its `rename`)
    #[must_use]
    pub fn declared_name(&self) -> &str {
        &self.declared
    }

    #[must_use]
    pub fn input(&self) -> Option<InputShape> {
        self.input
    }

    #[must_use]
    pub fn outputs(&self) -> Outputs {
        self.outputs
    }

    #[inline]
    #[must_use]
    pub fn takes_input(&self) -> bool {
        self.input.is_some()
    }

    /// Call the method.
    ///
    /// `input` is ignored by methods without an input shape.
    ///
    /// # Errors
    ///
    /// Returns the decode error when `input` does not fit the input shape. Errors
    /// returned by the method itself are part of the [`Outcome`].
    pub fn invoke(&self, input: Option<Value>) -> Result<Outcome, DecodeError> {
        (self.handle)(input)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("input", &self.input)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// Immutable table of a service's dispatchable methods.
pub struct Registry {
    entries: HashMap<String, MethodDescriptor>,
    /// Case-folded canonical name -> canonical name, unambiguous keys only
    folded: HashMap<String, String>,
    exclusions: Vec<Exclusion>,
}

impl Registry {
    /// Build the registry for `service`.
    #[must_use]
    pub fn build<S: Service>(service: Arc<S>) -> Self {
        Self::build_with(service, false)
    }

    /// Build the registry, logging every excluded method when `verbose` is set.
    #[must_use]
    pub fn build_with<S: Service>(service: Arc<S>, verbose: bool) -> Self {
        let service_type = std::any::type_name::<S>();
        let mut exclusions = S::exclusions();
        let mut entries: HashMap<String, MethodDescriptor> = HashMap::new();

        for def in S::methods() {
            let canonical = to_canonical(&def.name);
            if canonical.is_empty() {
                exclusions.push(Exclusion::new(def.name, "name is empty after canonicalization"));
                continue;
            }
            if let Some(existing) = entries.get(&canonical) {
                if verbose {
                    warn!(
                        service = service_type,
                        method = %def.name,
                        canonical = %canonical,
                        kept = %existing.declared,
                        "Duplicate canonical method name - later method ignored"
                    );
                }
                exclusions.push(Exclusion::new(def.name, "canonical name already registered"));
                continue;
            }

            let MethodDef {
                name,
                input,
                outputs,
                call,
            } = def;
            let receiver = Arc::clone(&service);
            let handle: Handle = Box::new(move |body| call(&receiver, body));

            debug!(
                service = service_type,
                method = %canonical,
                input = input.map(|s| s.type_name()).unwrap_or("-"),
                outputs = outputs.arity(),
                "Method registered"
            );
            entries.insert(
                canonical.clone(),
                MethodDescriptor {
                    name: canonical,
                    declared: name,
                    input,
                    outputs,
                    handle,
                },
            );
        }

        if verbose {
            for exclusion in &exclusions {
                info!(
                    service = service_type,
                    method = %exclusion.name,
                    reason = exclusion.reason,
                    "Method excluded from registry"
                );
            }
        }

        let folded = fold_index(entries.keys());
        info!(
            service = service_type,
            registered = entries.len(),
            excluded = exclusions.len(),
            "Registry built"
        );

        Registry {
            entries,
            folded,
            exclusions,
        }
    }

    /// Resolve a raw method name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&MethodDescriptor> {
        let canonical = to_canonical(name);
        self.entries.get(&canonical).or_else(|| {
            self.folded
                .get(&fold(&canonical))
                .and_then(|key| self.entries.get(key))
        })
    }

    /// All registered methods, in no particular order.
    pub fn list(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.entries.values()
    }

    /// Canonical names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("methods", &self.names())
            .field("exclusions", &self.exclusions)
            .finish()
    }
}

/// Build the case-insensitive fallback index. Keys that fold onto the same
/// string are left out so a fallback hit is never a guess.
fn fold_index<'a>(keys: impl Iterator<Item = &'a String>) -> HashMap<String, String> {
    let mut folded: HashMap<String, String> = HashMap::new();
    let mut ambiguous: HashSet<String> = HashSet::new();
    for key in keys {
        let f = fold(key);
        if ambiguous.contains(&f) {
            continue;
        }
        if folded.insert(f.clone(), key.clone()).is_some() {
            folded.remove(&f);
            ambiguous.insert(f);
        }
    }
    folded
}
