use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::commands::{Command, CommandContext};
use crate::permissions::AccountPermission;

/// Which kind of conversation a command may be used from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllowedDestination {
    Channel,
    PrivateMessage,
    #[default]
    Any,
}

/// Section of the help listing a command is shown under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelpCategory {
    /// Commands that change the shared rescue board
    Board,
    Rescues,
    Account,
    Management,
    Utility,
}

impl HelpCategory {
    /// Categories in the order help lists them
    pub const ALL: [HelpCategory; 5] = [
        HelpCategory::Board,
        HelpCategory::Rescues,
        HelpCategory::Account,
        HelpCategory::Management,
        HelpCategory::Utility,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HelpCategory::Board => "board",
            HelpCategory::Rescues => "rescues",
            HelpCategory::Account => "account",
            HelpCategory::Management => "management",
            HelpCategory::Utility => "utility",
        }
    }
}

impl fmt::Display for HelpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HelpCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HelpCategory::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Problems found while building a declaration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("a command declaration needs at least one keyword")]
    NoKeywords,

    #[error("{keyword}: minimum of {min} parameters is above the maximum of {max}")]
    InvalidArity {
        keyword: String,
        min: usize,
        max: usize,
    },
}

/// The contract of one command family: keywords, arity, options, who may use it and where
#[derive(Clone)]
pub struct CommandDeclaration {
    keywords: Vec<String>,
    min_parameters: usize,
    max_parameters: Option<usize>,
    last_parameter_is_continuous: bool,
    short_options: Vec<char>,
    named_options: Vec<String>,
    permission: Option<AccountPermission>,
    destination: AllowedDestination,
    category: Option<HelpCategory>,
    description: String,
    param_text: Option<String>,
    example: Option<String>,
    handler: Arc<dyn Command>,
}

impl CommandDeclaration {
    /// Start declaring a command
    ///
    /// # Arguments
    /// * `keywords` - The command name followed by its aliases
    /// * `handler` - What runs once an invocation passes validation
    pub fn builder<C>(keywords: &[&str], handler: C) -> DeclarationBuilder
    where
        C: Command + 'static,
    {
        DeclarationBuilder {
            keywords: keywords.iter().map(|keyword| keyword.to_lowercase()).collect(),
            min_parameters: 0,
            max_parameters: None,
            last_parameter_is_continuous: false,
            short_options: Vec::new(),
            named_options: Vec::new(),
            permission: None,
            destination: AllowedDestination::Any,
            category: None,
            description: String::new(),
            param_text: None,
            example: None,
            handler: Arc::new(handler),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// The first keyword, used when no alias was invoked
    pub fn primary_keyword(&self) -> &str {
        &self.keywords[0]
    }

    pub fn matches(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|candidate| candidate == keyword)
    }

    pub fn min_parameters(&self) -> usize {
        self.min_parameters
    }

    pub fn max_parameters(&self) -> Option<usize> {
        self.max_parameters
    }

    pub fn last_parameter_is_continuous(&self) -> bool {
        self.last_parameter_is_continuous
    }

    pub fn short_options(&self) -> &[char] {
        &self.short_options
    }

    pub fn named_options(&self) -> &[String] {
        &self.named_options
    }

    pub fn permission(&self) -> Option<AccountPermission> {
        self.permission
    }

    pub fn destination(&self) -> AllowedDestination {
        self.destination
    }

    pub fn category(&self) -> Option<HelpCategory> {
        self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }

    /// Whether the command changes the rescue board and so is watched for blacklisted users
    pub fn is_dispatching(&self) -> bool {
        self.category == Some(HelpCategory::Board)
            && matches!(
                self.permission,
                Some(AccountPermission::RescueWrite | AccountPermission::RescueWriteOwn)
            )
    }

    /// Render `<keyword> [-<options>] [--named]... <params>`
    ///
    /// # Arguments
    /// * `invoked` - The alias the user typed, if any
    pub fn usage_description(&self, invoked: Option<&str>) -> String {
        let mut usage = invoked.unwrap_or(self.primary_keyword()).to_string();

        if !self.short_options.is_empty() {
            let options: String = self.short_options.iter().collect();
            usage.push_str(&format!(" [-{}]", options));
        }

        for named in &self.named_options {
            usage.push_str(&format!(" [--{}]", named));
        }

        if let Some(param_text) = &self.param_text {
            usage.push(' ');
            usage.push_str(param_text);
        }
        usage
    }

    /// Render `<keyword> <example>`
    pub fn example_description(&self, invoked: Option<&str>) -> String {
        let keyword = invoked.unwrap_or(self.primary_keyword());
        match &self.example {
            Some(example) => format!("{} {}", keyword, example),
            None => keyword.to_string(),
        }
    }

    /// Run the handler for a validated invocation
    pub fn invoke(&self, ctx: &CommandContext<'_>) {
        self.handler.execute(ctx);
    }
}

impl fmt::Debug for CommandDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDeclaration")
            .field("keywords", &self.keywords)
            .field("min_parameters", &self.min_parameters)
            .field("max_parameters", &self.max_parameters)
            .field("continuous", &self.last_parameter_is_continuous)
            .field("short_options", &self.short_options)
            .field("named_options", &self.named_options)
            .field("permission", &self.permission)
            .field("destination", &self.destination)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`CommandDeclaration::builder`]
pub struct DeclarationBuilder {
    keywords: Vec<String>,
    min_parameters: usize,
    max_parameters: Option<usize>,
    last_parameter_is_continuous: bool,
    short_options: Vec<char>,
    named_options: Vec<String>,
    permission: Option<AccountPermission>,
    destination: AllowedDestination,
    category: Option<HelpCategory>,
    description: String,
    param_text: Option<String>,
    example: Option<String>,
    handler: Arc<dyn Command>,
}

impl DeclarationBuilder {
    /// Accepted parameter counts, e.g. `1..=2` or `1..`
    pub fn parameters<R: RangeBounds<usize>>(mut self, range: R) -> Self {
        self.min_parameters = match range.start_bound() {
            Bound::Included(&min) => min,
            Bound::Excluded(&min) => min + 1,
            Bound::Unbounded => 0,
        };
        self.max_parameters = match range.end_bound() {
            Bound::Included(&max) => Some(max),
            Bound::Excluded(&max) => Some(max.saturating_sub(1)),
            Bound::Unbounded => None,
        };
        self
    }

    /// Let the last parameter swallow the rest of the line
    pub fn continuous(mut self) -> Self {
        self.last_parameter_is_continuous = true;
        self
    }

    /// Allowed single-character options, e.g. `"af"` for `-a` and `-f`
    pub fn options(mut self, options: &str) -> Self {
        for option in options.chars() {
            if !self.short_options.contains(&option) {
                self.short_options.push(option);
            }
        }
        self
    }

    /// Allowed `--named` options
    pub fn named_options(mut self, options: &[&str]) -> Self {
        for option in options {
            if !self.named_options.iter().any(|known| known == option) {
                self.named_options.push(option.to_string());
            }
        }
        self
    }

    pub fn permission(mut self, permission: AccountPermission) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn destination(mut self, destination: AllowedDestination) -> Self {
        self.destination = destination;
        self
    }

    pub fn category(mut self, category: HelpCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn param_text(mut self, param_text: &str) -> Self {
        self.param_text = Some(param_text.to_string());
        self
    }

    pub fn example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    /// Finish the declaration, checking keywords and arity
    pub fn build(self) -> Result<CommandDeclaration, DeclarationError> {
        let Some(primary) = self.keywords.first() else {
            return Err(DeclarationError::NoKeywords);
        };

        if let Some(max) = self.max_parameters {
            if self.min_parameters > max {
                return Err(DeclarationError::InvalidArity {
                    keyword: primary.clone(),
                    min: self.min_parameters,
                    max,
                });
            }
        }

        Ok(CommandDeclaration {
            keywords: self.keywords,
            min_parameters: self.min_parameters,
            max_parameters: self.max_parameters,
            last_parameter_is_continuous: self.last_parameter_is_continuous,
            short_options: self.short_options,
            named_options: self.named_options,
            permission: self.permission,
            destination: self.destination,
            category: self.category,
            description: self.description,
            param_text: self.param_text,
            example: self.example,
            handler: self.handler,
        })
    }
}
