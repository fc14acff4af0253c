use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chat::{ChatMessage, Outbox};
use crate::commands::{
    AllowedDestination, Blacklist, CommandContext, CommandDeclaration, CommandRegistry, Invocation,
    collapse_continuation,
};
use crate::i18n::english_list;
use crate::permissions::{AccountPermission, PermissionOracle};

/// Keyword the `-h` shortcut is routed to
const HELP_COMMAND: &str = "help";

/// Reasons an invocation is refused before its handler runs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("illegal named options: {}", .0.join(", "))]
    IllegalNamedOption(Vec<String>),

    #[error("illegal options: {}", .0.iter().collect::<String>())]
    IllegalShortOption(Vec<char>),

    #[error("command is restricted to {0:?}")]
    WrongDestination(AllowedDestination),

    #[error("too few parameters")]
    TooFewParameters,

    #[error("too many parameters")]
    TooManyParameters,

    #[error("missing permission {0}")]
    PermissionDenied(AccountPermission),
}

impl DispatchError {
    /// The localization key the error is reported with
    pub fn message_key(&self) -> &'static str {
        match self {
            DispatchError::IllegalNamedOption(_) => "command.illegalnamedoptions",
            DispatchError::IllegalShortOption(_) => "command.illegaloptions",
            DispatchError::WrongDestination(AllowedDestination::Channel) => "command.publiconly",
            DispatchError::WrongDestination(_) => "command.privateonly",
            DispatchError::TooFewParameters => "command.toofewparams",
            DispatchError::TooManyParameters => "command.toomanyparams",
            DispatchError::PermissionDenied(_) => "board.nopermission",
        }
    }

    fn substitutions(
        &self,
        declaration: &CommandDeclaration,
        invocation: &Invocation,
    ) -> Vec<(&'static str, String)> {
        let command = ("command", invocation.command.clone());
        let usage = (
            "usage",
            format!(
                "Usage: {}.",
                declaration.usage_description(Some(&invocation.command))
            ),
        );
        let example = (
            "example",
            format!(
                "Example: {}.",
                declaration.example_description(Some(&invocation.command))
            ),
        );

        match self {
            DispatchError::IllegalNamedOption(options) => {
                vec![("options", english_list(options.as_slice())), command, usage, example]
            }
            DispatchError::IllegalShortOption(options) => {
                vec![("options", options.iter().collect()), command, usage, example]
            }
            DispatchError::TooFewParameters | DispatchError::TooManyParameters => {
                vec![command, usage, example]
            }
            DispatchError::WrongDestination(_) | DispatchError::PermissionDenied(_) => {
                vec![command]
            }
        }
    }
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a registered command, or history playback
    Ignored,
    /// Routed to help by `-h`
    Help,
    /// Refused with an error reply
    Rejected(DispatchError),
    /// Passed validation and the handler ran
    Invoked,
}

/// Matches incoming commands against the registry, validates them and runs their handlers
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    permissions: Arc<dyn PermissionOracle>,
    blacklist: Arc<Blacklist>,
    outbox: Outbox,
    prefix: String,
    /// Channel that receives blacklist warnings
    moderation_channel: String,
}

impl CommandDispatcher {
    /// Create a new command dispatcher
    ///
    /// # Arguments
    /// * `registry` - The registry of available commands
    /// * `permissions` - Answers permission checks for senders
    /// * `blacklist` - Users whose dispatching commands are reported
    /// * `outbox` - Where replies and warnings are queued
    /// * `prefix` - The command prefix (e.g., "!")
    /// * `moderation_channel` - Channel that receives blacklist warnings
    pub fn new(
        registry: Arc<CommandRegistry>,
        permissions: Arc<dyn PermissionOracle>,
        blacklist: Arc<Blacklist>,
        outbox: Outbox,
        prefix: String,
        moderation_channel: String,
    ) -> Self {
        CommandDispatcher {
            registry,
            permissions,
            blacklist,
            outbox,
            prefix,
            moderation_channel,
        }
    }

    /// Process an incoming chat message
    pub fn handle_message(&self, message: ChatMessage) -> DispatchOutcome {
        if message.is_playback() {
            debug!(
                "Ignoring playback message from {} received at {}",
                message.sender.nickname,
                message.timestamp()
            );
            return DispatchOutcome::Ignored;
        }

        match Invocation::parse(message, &self.prefix) {
            Some(invocation) => self.dispatch(invocation),
            None => DispatchOutcome::Ignored,
        }
    }

    /// Validate an invocation and run its handler
    ///
    /// At most one error reply is sent; once validation fails nothing else happens.
    pub fn dispatch(&self, mut invocation: Invocation) -> DispatchOutcome {
        let Some(declaration) = self.registry.find(&invocation.command) else {
            debug!("No command registered for {}", invocation.command);
            return DispatchOutcome::Ignored;
        };

        if invocation.has_option('h') {
            self.redirect_to_help(invocation);
            return DispatchOutcome::Help;
        }

        if let Err(e) = self.validate(declaration, &mut invocation) {
            info!(
                "Rejected {} from {}: {}",
                invocation.command, invocation.message.sender.nickname, e
            );
            let substitutions = e.substitutions(declaration, &invocation);
            self.outbox
                .error(&invocation, e.message_key(), &substitutions);
            return DispatchOutcome::Rejected(e);
        }

        if declaration.is_dispatching() && self.blacklist.matches(&invocation.message.sender) {
            warn!(
                "Blacklisted user {} used {}",
                invocation.message.sender.nickname, invocation.command
            );
            self.outbox.send_to_channel(
                &self.moderation_channel,
                "command.blacklist",
                &[
                    ("command", invocation.command.clone()),
                    ("nick", invocation.message.sender.nickname.clone()),
                ],
            );
        }

        debug!(
            "Executing command: {} {:?}",
            invocation.command, invocation.parameters
        );
        let ctx = CommandContext {
            invocation,
            registry: self.registry.as_ref(),
            outbox: &self.outbox,
            prefix: &self.prefix,
        };
        declaration.invoke(&ctx);
        DispatchOutcome::Invoked
    }

    /// Option, destination, arity and permission checks, in that order
    fn validate(
        &self,
        declaration: &CommandDeclaration,
        invocation: &mut Invocation,
    ) -> Result<(), DispatchError> {
        let illegal_named = invocation.illegal_named_options(declaration.named_options());
        if !illegal_named.is_empty() {
            return Err(DispatchError::IllegalNamedOption(illegal_named));
        }

        let illegal = invocation.illegal_options(declaration.short_options());
        if !illegal.is_empty() {
            return Err(DispatchError::IllegalShortOption(illegal));
        }

        self.check_destination(declaration, invocation)?;

        if invocation.parameters.len() < declaration.min_parameters() {
            return Err(DispatchError::TooFewParameters);
        }

        if let Some(max) = declaration.max_parameters() {
            if declaration.last_parameter_is_continuous() && invocation.parameters.len() > 1 {
                let parameters = std::mem::take(&mut invocation.parameters);
                invocation.parameters = collapse_continuation(parameters, max);
            }

            if invocation.parameters.len() > max {
                return Err(DispatchError::TooManyParameters);
            }
        }

        if let Some(permission) = declaration.permission() {
            if !self
                .permissions
                .has_permission(&invocation.message.sender, permission)
            {
                return Err(DispatchError::PermissionDenied(permission));
            }
        }

        Ok(())
    }

    /// Channel-only and private-only restrictions; `rescue.write` holders are exempt
    fn check_destination(
        &self,
        declaration: &CommandDeclaration,
        invocation: &Invocation,
    ) -> Result<(), DispatchError> {
        let is_private = invocation.message.destination.is_private();
        let violated = match declaration.destination() {
            AllowedDestination::Channel => is_private,
            AllowedDestination::PrivateMessage => !is_private,
            AllowedDestination::Any => false,
        };

        if violated
            && !self
                .permissions
                .has_permission(&invocation.message.sender, AccountPermission::RescueWrite)
        {
            return Err(DispatchError::WrongDestination(declaration.destination()));
        }
        Ok(())
    }

    /// Show help for the invoked command instead of running it
    fn redirect_to_help(&self, invocation: Invocation) {
        let Some(help) = self.registry.find(HELP_COMMAND) else {
            debug!("-h used on {} but no help command is registered", invocation.command);
            return;
        };

        let topic = invocation.command.clone();
        let ctx = CommandContext {
            invocation: Invocation {
                command: HELP_COMMAND.to_string(),
                parameters: vec![topic],
                short_options: Vec::new(),
                named_options: Vec::new(),
                message: invocation.message,
            },
            registry: self.registry.as_ref(),
            outbox: &self.outbox,
            prefix: &self.prefix,
        };
        help.invoke(&ctx);
    }
}
