use crate::commands::{
    Command, CommandContext, CommandDeclaration, CommandRegistry, DeclarationError, HelpCategory,
};

/// A command that displays help information for registered commands
///
/// `!help` lists every category, `!help <category>` lists one and
/// `!help <command>` shows its usage. The dispatcher also routes `-h` here.
pub struct HelpCommand;

impl HelpCommand {
    pub fn declaration() -> Result<CommandDeclaration, DeclarationError> {
        CommandDeclaration::builder(&["help"], HelpCommand)
            .parameters(0..=1)
            .category(HelpCategory::Utility)
            .description("Shows help information for available commands.")
            .param_text("[command or category]")
            .example("shorten")
            .build()
    }

    /// Add the help command to a registry
    pub fn register(registry: &mut CommandRegistry) -> Result<(), DeclarationError> {
        registry.register(HelpCommand::declaration()?);
        Ok(())
    }

    fn list_categories(&self, ctx: &CommandContext<'_>) {
        let mut listed = false;

        for category in HelpCategory::ALL {
            if let Some(commands) = self.category_listing(ctx, category) {
                ctx.reply(
                    "help.category",
                    &[("category", category.to_string()), ("commands", commands)],
                );
                listed = true;
            }
        }

        if !listed {
            ctx.reply("help.empty", &[]);
        }
    }

    fn category_listing(&self, ctx: &CommandContext<'_>, category: HelpCategory) -> Option<String> {
        let commands: Vec<String> = ctx
            .registry
            .in_category(category)
            .map(|declaration| format!("{}{}", ctx.prefix, declaration.primary_keyword()))
            .collect();

        if commands.is_empty() {
            None
        } else {
            Some(commands.join(", "))
        }
    }

    fn describe(&self, ctx: &CommandContext<'_>, declaration: &CommandDeclaration, invoked: &str) {
        ctx.reply(
            "help.command",
            &[
                (
                    "usage",
                    format!("{}{}", ctx.prefix, declaration.usage_description(Some(invoked))),
                ),
                ("description", declaration.description().to_string()),
            ],
        );

        if declaration.example().is_some() {
            ctx.reply(
                "help.example",
                &[(
                    "example",
                    format!("{}{}", ctx.prefix, declaration.example_description(Some(invoked))),
                )],
            );
        }

        if let Some(permission) = declaration.permission() {
            ctx.reply("help.permission", &[("permission", permission.to_string())]);
        }
    }
}

impl Command for HelpCommand {
    fn execute(&self, ctx: &CommandContext<'_>) {
        let Some(topic) = ctx.invocation.parameters.first() else {
            self.list_categories(ctx);
            return;
        };

        let topic = topic.strip_prefix(ctx.prefix).unwrap_or(topic).to_lowercase();

        if let Some(declaration) = ctx.registry.find(&topic) {
            self.describe(ctx, declaration, &topic);
        } else if let Ok(category) = topic.parse::<HelpCategory>() {
            match self.category_listing(ctx, category) {
                Some(commands) => ctx.reply(
                    "help.category",
                    &[("category", category.to_string()), ("commands", commands)],
                ),
                None => ctx.reply("help.empty", &[]),
            }
        } else {
            ctx.error("help.notfound", &[("topic", topic)]);
        }
    }
}
