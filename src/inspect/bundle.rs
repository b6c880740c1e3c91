//! Message templates.
//!
//! Templates use positional placeholders (`{0}`, `{1}`, ...) filled from
//! the argument slice. Looking up an unknown key yields the key itself so a
//! missing entry shows up in the output instead of failing the check.

use phf::phf_map;

static MESSAGES: phf::Map<&'static str, &'static str> = phf_map! {
    // Usage of an expensive API
    "expensive.api.usage.api.is.marked.expensive.itself" =>
        "'{0}' is marked expensive with @{1}",
    "expensive.api.usage.api.is.marked.expensive.itself.in.loop" =>
        "'{0}' is marked expensive with @{1} and is called inside a loop",
    "expensive.api.usage.api.is.marked.expensive.itself.in.lambda" =>
        "'{0}' is marked expensive with @{1} and is called inside a lambda",
    "expensive.api.usage.api.is.declared.in.expensive.api" =>
        "'{0}' is declared in {1} '{2}' marked expensive with @{3}",
    "expensive.api.usage.api.is.declared.in.expensive.api.in.loop" =>
        "'{0}' is declared in {1} '{2}' marked expensive with @{3} and is called inside a loop",
    "expensive.api.usage.api.is.declared.in.expensive.api.in.lambda" =>
        "'{0}' is declared in {1} '{2}' marked expensive with @{3} and is called inside a lambda",
    "expensive.api.usage.overridden.method.is.marked.expensive.itself" =>
        "Overridden method '{0}' is marked expensive with @{1}",
    "expensive.api.usage.overridden.method.is.declared.in.expensive.api" =>
        "Overridden method '{0}' is declared in {1} '{2}' marked expensive with @{3}",
    "expensive.api.usage.expensive.type.is.used.in.signature.of.referenced.api" =>
        "'{0}' references expensive {1} '{2}' marked with @{3} in its signature",

    // Usage of an API scheduled for removal
    "scheduled.for.removal.api.is.marked.itself" =>
        "'{0}' is scheduled for removal in {1}",
    "scheduled.for.removal.api.is.declared.in.marked.api" =>
        "'{0}' is declared in {1} '{2}' which is scheduled for removal in {3}",
    "scheduled.for.removal.method.overridden.marked.itself" =>
        "Overridden method '{0}' is scheduled for removal in {1}",
    "scheduled.for.removal.method.overridden.declared.in.marked.api" =>
        "Overridden method '{0}' is declared in {1} '{2}' which is scheduled for removal in {3}",
    "scheduled.for.removal.type.is.used.in.signature.of.referenced.api" =>
        "'{0}' references {1} '{2}' in its signature, which is scheduled for removal in {3}",
    "scheduled.for.removal.future.version" => "a future version",
    "scheduled.for.removal.predefined.version" => "version {0}",

    // Declarations exposing an expensive type
    "expensive.type.used.in.method.signature.description" =>
        "Method must be marked with '@{0}' annotation because its signature references expensive type '{1}'",
    "expensive.type.used.in.field.signature.description" =>
        "Field must be marked with '@{0}' annotation because its type references expensive type '{1}'",
    "expensive.type.used.in.class.signature.description" =>
        "Class must be marked with '@{0}' annotation because its declaration references expensive type '{1}'",
};

/// Look up the raw template for `key`.
pub fn template(key: &str) -> Option<&'static str> {
    MESSAGES.get(key).copied()
}

/// Format the template for `key` with positional `args`.
pub fn message(key: &str, args: &[&str]) -> String {
    match template(key) {
        Some(t) => format_template(t, args),
        None => key.to_string(),
    }
}

/// Replace `{n}` placeholders with `args[n]`.
///
/// Placeholders without a matching argument are left as written.
fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + args.iter().map(|a| a.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg, close))
        });
        match replaced {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
