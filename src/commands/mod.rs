mod blacklist;
mod declaration;
mod handler;
mod help;
mod invocation;

use std::collections::HashSet;

use crate::chat::Outbox;

pub use blacklist::Blacklist;
pub use declaration::{AllowedDestination, CommandDeclaration, DeclarationError, HelpCategory};
pub use handler::{CommandDispatcher, DispatchError, DispatchOutcome};
pub use help::HelpCommand;
pub use invocation::{Invocation, collapse_continuation};

/// Trait for command handlers
///
/// Handlers run after the dispatcher has validated the invocation. They report
/// their own failures through the context; nothing is returned to the dispatcher.
/// Any plain function or closure taking a `&CommandContext` is a handler too.
pub trait Command: Send + Sync {
    fn execute(&self, ctx: &CommandContext<'_>);
}

impl<F> Command for F
where
    F: Fn(&CommandContext<'_>) + Send + Sync,
{
    fn execute(&self, ctx: &CommandContext<'_>) {
        self(ctx)
    }
}

/// Everything a handler can see while it runs
pub struct CommandContext<'a> {
    pub invocation: Invocation,
    pub registry: &'a CommandRegistry,
    pub outbox: &'a Outbox,
    /// The command prefix, for rendering command names back to users
    pub prefix: &'a str,
}

impl CommandContext<'_> {
    /// Reply to the invoking message
    pub fn reply(&self, key: &str, substitutions: &[(&str, String)]) {
        self.outbox.reply(&self.invocation.message, key, substitutions);
    }

    /// Reply to the invoking message with an error
    pub fn error(&self, key: &str, substitutions: &[(&str, String)]) {
        self.outbox.error(&self.invocation, key, substitutions);
    }
}

/// An ordered collection of command declarations
///
/// Filled once during startup, then shared read-only. Lookup returns the
/// first declaration claiming a keyword, in registration order.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    declarations: Vec<CommandDeclaration>,
}

impl CommandRegistry {
    /// Create a new empty command registry
    pub fn new() -> Self {
        CommandRegistry {
            declarations: Vec::new(),
        }
    }

    /// Append a declaration
    ///
    /// Keywords already claimed by an earlier declaration are not rejected;
    /// see [`CommandRegistry::duplicate_keywords`].
    pub fn register(&mut self, declaration: CommandDeclaration) {
        self.declarations.push(declaration);
    }

    /// Find the first declaration claiming a keyword
    pub fn find(&self, keyword: &str) -> Option<&CommandDeclaration> {
        self.declarations
            .iter()
            .find(|declaration| declaration.matches(keyword))
    }

    pub fn declarations(&self) -> &[CommandDeclaration] {
        &self.declarations
    }

    /// Declarations listed under a help category, in registration order
    pub fn in_category(
        &self,
        category: HelpCategory,
    ) -> impl Iterator<Item = &CommandDeclaration> + '_ {
        self.declarations
            .iter()
            .filter(move |declaration| declaration.category() == Some(category))
    }

    /// Keywords claimed by more than one declaration, in first-seen order
    pub fn duplicate_keywords(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();

        for keyword in self
            .declarations
            .iter()
            .flat_map(|declaration| declaration.keywords())
        {
            if !seen.insert(keyword.as_str()) && !duplicates.contains(keyword) {
                duplicates.push(keyword.clone());
            }
        }
        duplicates
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
