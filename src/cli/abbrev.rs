// Command abbreviation matching for the filterq CLI

/// Find all commands that start with the given prefix (case-insensitive)
pub fn find_matching_commands<'a>(prefix: &str, commands: &'a [&str]) -> Vec<&'a str> {
    let prefix_lower = prefix.to_lowercase();
    commands
        .iter()
        .filter(|cmd| cmd.to_lowercase().starts_with(&prefix_lower))
        .copied()
        .collect()
}

/// Find a unique command match for the given prefix
/// Returns Ok(command) if exactly one match, Err(matches) if ambiguous, Err(empty) if no match
/// Note: Exact matches take precedence over prefix matches
pub fn find_unique_command<'a>(prefix: &str, commands: &'a [&str]) -> Result<&'a str, Vec<&'a str>> {
    let prefix_lower = prefix.to_lowercase();
    if let Some(cmd) = commands.iter().find(|cmd| cmd.to_lowercase() == prefix_lower) {
        return Ok(*cmd);
    }

    let matches = find_matching_commands(prefix, commands);
    match matches.len() {
        1 => Ok(matches[0]),
        _ => Err(matches),
    }
}

/// Top-level commands
pub const TOP_LEVEL_COMMANDS: &[&str] = &[
    "render", "parse", "check", "terms", "edit", "match", "replay", "suggest", "help",
];

/// Expand an abbreviated command in argument list
/// Only the first argument is a command; everything after it is passed through.
pub fn expand_command_abbreviations(mut args: Vec<String>) -> Result<Vec<String>, String> {
    let Some(first) = args.first() else {
        return Ok(args);
    };
    if first.starts_with('-') {
        return Ok(args);
    }

    match find_unique_command(first, TOP_LEVEL_COMMANDS) {
        Ok(full_cmd) => {
            args[0] = full_cmd.to_string();
            Ok(args)
        }
        // Unknown command: let clap report it
        Err(matches) if matches.is_empty() => Ok(args),
        Err(matches) => Err(format!(
            "Ambiguous command '{}'. Did you mean one of: {}?",
            first,
            matches.join(", ")
        )),
    }
}
