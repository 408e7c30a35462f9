//! Clap command tree generated from a [`Namespace`].
//!
//! Every command that is not hidden from the command line becomes a
//! subcommand named after its kebab-case CLI name. Positional parameters map
//! to indexed arguments, the rest to long options. Values are parsed as text
//! and converted by the parameter's kind in [`collect_values`].

use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand, builder::BoolishValueParser};
use heck::ToKebabCase;
use ipaschema_types::CLI_CONTEXT;
use serde_json::{Map, Value};

use crate::{
    catalog::ParamKind,
    command::CommandDescriptor,
    error::ConversionError,
    namespace::Namespace,
    param::ParameterDescriptor,
};

/// Builds the command tree for every CLI-visible command, listed topic by
/// topic in schema order.
///
/// Clap requires `'static` names; they are leaked, which is fine for a tree
/// built once per process.
///
/// # Arguments
/// * `namespace` - The compiled namespace to expose
///
/// # Returns
/// A root `ipa` command with one subcommand per command not excluded from
/// the `cli` context
///
/// # Example
/// ```rust
/// use std::sync::Arc;
///
/// use ipaschema_api::{OfflineApi, RemoteApi};
/// use ipaschema_registry::{Namespace, build_clap, collect_values};
/// use ipaschema_types::SchemaDocument;
/// use serde_json::json;
///
/// let document = SchemaDocument::from_wire(json!({
///     "fingerprint": "v1",
///     "commands": [{"name": "user_show", "params": [{"name": "uid", "type": "str"}]}]
/// }))
/// .unwrap();
/// let remote: Arc<dyn RemoteApi> = Arc::new(OfflineApi::new(document.clone()));
/// let namespace = Namespace::build(&document, &remote);
///
/// let matches = build_clap(&namespace).try_get_matches_from(["ipa", "user-show", "jdoe"]).unwrap();
/// let (name, sub_matches) = matches.subcommand().unwrap();
/// assert_eq!(name, "user-show");
/// let kw = collect_values(namespace.command("user_show").unwrap(), sub_matches).unwrap();
/// assert_eq!(kw["uid"], json!("jdoe"));
/// ```
pub fn build_clap(namespace: &Namespace) -> ClapCommand {
    let mut root = ClapCommand::new("ipa")
        .about("Commands materialized from the server schema")
        .subcommand_required(true);
    for (_, members) in namespace.names_by_topic() {
        for name in &members.commands {
            let Some(command) = namespace.command(name).filter(|command| !command.no_cli) else {
                continue;
            };
            root = root.subcommand(build_command_clap(command));
        }
    }
    root
}

/// Builds the clap subcommand for one command.
pub fn build_command_clap(command: &CommandDescriptor) -> ClapCommand {
    let name: &'static str = Box::leak(command.cli_name().into_boxed_str());
    let mut subcommand = ClapCommand::new(name);
    if let Some(doc) = &command.doc {
        subcommand = subcommand.about(first_line(doc).to_string()).long_about(doc.clone());
    }
    subcommand = add_positional_arguments(subcommand, command);
    add_options(subcommand, command)
}

/// Positional arguments get consecutive indices. Once one is optional the
/// rest are too, and only the last may take several values. A positional
/// flag takes an explicit boolean word (`true`, `no`, `1`, ...).
fn add_positional_arguments(mut subcommand: ClapCommand, command: &CommandDescriptor) -> ClapCommand {
    let visible: Vec<&ParameterDescriptor> = command.args.iter().filter(|param| param.use_in_context(CLI_CONTEXT)).collect();
    let mut required_so_far = true;
    for (i, param) in visible.iter().enumerate() {
        required_so_far &= must_be_given(param);
        let mut arg = base_arg(param).index(i + 1).required(required_so_far);
        arg = if param.kind == ParamKind::Flag {
            arg.action(ArgAction::Set).value_parser(BoolishValueParser::new())
        } else if param.multivalue && i + 1 == visible.len() {
            arg.action(ArgAction::Append).num_args(1..)
        } else {
            arg.action(ArgAction::Set)
        };
        subcommand = subcommand.arg(arg);
    }
    subcommand
}

fn add_options(mut subcommand: ClapCommand, command: &CommandDescriptor) -> ClapCommand {
    for param in command.options.iter().filter(|param| param.use_in_context(CLI_CONTEXT)) {
        let long: &'static str = Box::leak(option_flag(param).into_boxed_str());
        let mut arg = base_arg(param).long(long);
        arg = match param.kind {
            ParamKind::Flag => arg.action(ArgAction::SetTrue),
            _ if param.multivalue => arg.action(ArgAction::Append).required(must_be_given(param)),
            _ => arg.action(ArgAction::Set).required(must_be_given(param)),
        };
        if let Some(group) = &param.option_group {
            let heading: &'static str = Box::leak(group.clone().into_boxed_str());
            arg = arg.help_heading(heading);
        }
        subcommand = subcommand.arg(arg);
    }
    subcommand
}

fn base_arg(param: &ParameterDescriptor) -> Arg {
    let id: &'static str = Box::leak(param.name.clone().into_boxed_str());
    let mut arg = Arg::new(id);
    if let Some(metavar) = &param.cli_metavar {
        let metavar: &'static str = Box::leak(metavar.clone().into_boxed_str());
        arg = arg.value_name(metavar);
    }
    if let Some(help) = param.doc.as_ref().or(param.label.as_ref()) {
        arg = arg.help(first_line(help).to_string());
    }
    arg
}

/// Long flag for an option: its `cli_name` if declared, else the kebab-case
/// parameter name.
pub fn option_flag(param: &ParameterDescriptor) -> String {
    param.cli_name.clone().unwrap_or_else(|| param.name.to_kebab_case())
}

/// A required parameter must be given on the command line unless a default
/// can be filled in for it. Flags default to `false` and are never required.
fn must_be_given(param: &ParameterDescriptor) -> bool {
    param.required && !param.autofill && param.kind != ParamKind::Flag
}

fn first_line(text: &str) -> &str {
    text.lines().find(|line| !line.trim().is_empty()).map(str::trim).unwrap_or_default()
}

/// Reads the parsed command line back into a keyword map keyed by parameter
/// name, converting every value with its parameter's kind.
///
/// Option flags are only present when set and positional flags only when
/// given, so [`CommandDescriptor::fill_defaults`] can default the rest to
/// `false`.
pub fn collect_values(command: &CommandDescriptor, matches: &ArgMatches) -> Result<Map<String, Value>, ConversionError> {
    let mut kw = Map::new();
    for param in command.args.iter().filter(|param| param.use_in_context(CLI_CONTEXT)) {
        if param.kind == ParamKind::Flag {
            if let Some(&set) = matches.get_one::<bool>(&param.name) {
                kw.insert(param.name.clone(), Value::Bool(set));
            }
            continue;
        }
        collect_text(param, matches, &mut kw)?;
    }
    for param in command.options.iter().filter(|param| param.use_in_context(CLI_CONTEXT)) {
        if param.kind == ParamKind::Flag {
            if matches.get_flag(&param.name) {
                kw.insert(param.name.clone(), Value::Bool(true));
            }
            continue;
        }
        collect_text(param, matches, &mut kw)?;
    }
    Ok(kw)
}

fn collect_text(param: &ParameterDescriptor, matches: &ArgMatches, kw: &mut Map<String, Value>) -> Result<(), ConversionError> {
    let Some(texts) = matches.get_many::<String>(&param.name) else {
        return Ok(());
    };
    let mut raw: Vec<Value> = texts.map(|text| text_value(param.kind, text)).collect();
    let raw = if param.multivalue || raw.len() != 1 {
        Value::Array(raw)
    } else {
        raw.swap_remove(0)
    };
    kw.insert(param.name.clone(), param.convert(&raw)?);
    Ok(())
}

/// Dictionaries are written as JSON on the command line; everything else
/// stays text until converted.
fn text_value(kind: ParamKind, text: &str) -> Value {
    if kind == ParamKind::Dict
        && let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text)
    {
        return value;
    }
    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ipaschema_api::RemoteApi;
    use ipaschema_types::SchemaDocument;
    use serde_json::json;

    use super::*;
    use crate::{command::compile_command, test_support::RecordingRemote};

    fn remote() -> Arc<dyn RemoteApi> {
        Arc::new(RecordingRemote::with_defaults(json!({})))
    }

    fn user_add() -> CommandDescriptor {
        let spec = serde_json::from_value(json!({
            "name": "user_add",
            "doc": "Add a new user.\n\nLonger description.",
            "params": [
                {"name": "uid", "type": "str", "positional": true, "doc": "User login"},
                {"name": "givenname", "type": "str", "positional": false, "cli_name": "first", "label": "First name"},
                {"name": "uidnumber", "type": "int", "required": false, "cli_metavar": "NUMBER"},
                {"name": "mail", "type": "str", "required": false, "multivalue": true},
                {"name": "noprivate", "type": "bool", "required": false, "default": ["False"]},
                {"name": "userauthtype", "type": "str", "required": false, "exclude": ["cli"]},
                {"name": "setattr", "type": "dict", "required": false}
            ]
        }))
        .expect("deserialize CommandSpec");
        compile_command(&remote(), &spec).expect("compile")
    }

    fn parse(command: &CommandDescriptor, args: &[&str]) -> Result<ArgMatches, clap::Error> {
        build_command_clap(command).try_get_matches_from(std::iter::once("user-add").chain(args.iter().copied()))
    }

    #[test]
    fn builds_named_subcommand_with_arguments() {
        let clap = build_command_clap(&user_add());
        assert_eq!(clap.get_name(), "user-add");
        assert_eq!(clap.get_about().map(|a| a.to_string()), Some("Add a new user.".to_string()));
        let uid = clap.get_arguments().find(|a| a.get_id() == "uid").expect("uid arg");
        assert_eq!(uid.get_index(), Some(1));
        assert!(uid.is_required_set());
        let givenname = clap.get_arguments().find(|a| a.get_id() == "givenname").expect("givenname arg");
        assert_eq!(givenname.get_long(), Some("first"));
        assert!(clap.get_arguments().all(|a| a.get_id() != "userauthtype"));
    }

    #[test]
    fn collects_and_converts_values() {
        let command = user_add();
        let matches = parse(
            &command,
            &["jdoe", "--first", "John", "--uidnumber", "1001", "--mail", "a@x", "--mail", "b@x", "--noprivate", "--setattr", r#"{"k":"v"}"#],
        )
        .expect("parse");
        let kw = collect_values(&command, &matches).expect("collect");
        assert_eq!(kw["uid"], json!("jdoe"));
        assert_eq!(kw["givenname"], json!("John"));
        assert_eq!(kw["uidnumber"], json!(1001));
        assert_eq!(kw["mail"], json!(["a@x", "b@x"]));
        assert_eq!(kw["noprivate"], json!(true));
        assert_eq!(kw["setattr"], json!({"k": "v"}));
    }

    #[test]
    fn unset_flags_and_options_are_absent() {
        let command = user_add();
        let matches = parse(&command, &["jdoe", "--first", "John"]).expect("parse");
        let kw = collect_values(&command, &matches).expect("collect");
        assert!(!kw.contains_key("noprivate"));
        assert!(!kw.contains_key("mail"));
    }

    #[test]
    fn missing_required_option_is_rejected() {
        let command = user_add();
        assert!(parse(&command, &["jdoe"]).is_err());
    }

    #[test]
    fn conversion_failure_is_reported() {
        let command = user_add();
        let matches = parse(&command, &["jdoe", "--first", "John", "--uidnumber", "many"]).expect("parse");
        let err = collect_values(&command, &matches).unwrap_err();
        assert_eq!(err.kind, ParamKind::Int);
    }

    fn cert_request() -> CommandDescriptor {
        let spec = serde_json::from_value(json!({
            "name": "cert_request",
            "params": [
                {"name": "csr", "type": "str", "positional": true},
                {"name": "principal", "type": "str", "positional": true, "multivalue": true},
                {"name": "attrs", "type": "dict", "positional": true},
                {"name": "add", "type": "bool", "positional": true, "default": ["False"]}
            ]
        }))
        .expect("deserialize CommandSpec");
        compile_command(&remote(), &spec).expect("compile")
    }

    #[test]
    fn positional_flag_takes_a_boolean_word() {
        let command = cert_request();
        let add = command.args.iter().find(|param| param.name == "add").expect("add arg");
        assert_eq!(add.kind, ParamKind::Flag);

        let matches = parse(&command, &["CSR", "host/a", r#"{"k":"v"}"#, "true"]).expect("parse");
        let kw = collect_values(&command, &matches).expect("collect");
        assert_eq!(kw["add"], json!(true));

        let matches = parse(&command, &["CSR", "host/a", r#"{"k":"v"}"#, "no"]).expect("parse");
        let kw = collect_values(&command, &matches).expect("collect");
        assert_eq!(kw["add"], json!(false));

        let matches = parse(&command, &["CSR", "host/a", r#"{"k":"v"}"#]).expect("parse");
        let kw = collect_values(&command, &matches).expect("collect");
        assert!(!kw.contains_key("add"));
    }

    #[test]
    fn positional_flag_rejects_other_words() {
        let command = cert_request();
        assert!(parse(&command, &["CSR", "host/a", "{}", "maybe"]).is_err());
    }

    #[test]
    fn multivalue_positional_before_the_last_takes_one_value() {
        let command = cert_request();
        let clap = build_command_clap(&command);
        let principal = clap.get_arguments().find(|a| a.get_id() == "principal").expect("principal arg");
        assert_eq!(principal.get_index(), Some(2));
        assert!(matches!(principal.get_action(), ArgAction::Set));

        let matches = parse(&command, &["CSR", "host/a", "{}"]).expect("parse");
        let kw = collect_values(&command, &matches).expect("collect");
        assert_eq!(kw["principal"], json!(["host/a"]));
        assert!(parse(&command, &["CSR", "host/a", "host/b", "{}", "yes", "extra"]).is_err());
    }

    #[test]
    fn positional_dict_is_read_as_json() {
        let command = cert_request();
        let matches = parse(&command, &["CSR", "host/a", r#"{"profile":"caIPAserviceCert"}"#]).expect("parse");
        let kw = collect_values(&command, &matches).expect("collect");
        assert_eq!(kw["csr"], json!("CSR"));
        assert_eq!(kw["attrs"], json!({"profile": "caIPAserviceCert"}));
    }

    #[test]
    fn tree_skips_cli_hidden_commands() {
        let document = SchemaDocument::from_wire(json!({
            "fingerprint": "v1",
            "commands": [
                {"name": "user_add", "topic_topic": "user"},
                {"name": "internal_sync", "exclude": ["cli"]},
                {"name": "ping"}
            ]
        }))
        .expect("decode schema");
        let namespace = Namespace::build(&document, &remote());
        let root = build_clap(&namespace);
        let names: Vec<_> = root.get_subcommands().map(|c| c.get_name()).collect();
        assert_eq!(names, vec!["user-add", "ping"]);
    }
}
