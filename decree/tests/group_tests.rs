use decree::{config, ConfigOverrides, FunctionSpec, Group, Param, Runnable, Signature, TypeHint};
use serde_json::json;
use test_log::test;

fn echo(name: &str, params: Vec<Param>) -> FunctionSpec {
    FunctionSpec::new(name, Signature::new(params).unwrap(), |_, call| Ok(call.to_value()))
}

fn group(class_name: &str) -> Group {
    Group::builder(class_name)
        .command("f", echo("f", vec![]))
        .build()
        .unwrap()
}

#[test]
fn test_reverse_registration_is_circular() {
    let parent = group("Parent");
    let child = group("Child");
    parent.register([&child]).unwrap();

    let err = child.register([&parent]).unwrap_err();
    assert_eq!(
        err.message(),
        "Group 'Child' is a descendant subgroup of 'Parent', causing a circular dependency."
    );
    assert_eq!(parent.subgroups(), vec![child.clone()]);
    assert!(child.subgroups().is_empty());
}

#[test]
fn test_cycles_never_change_registrations() {
    let (a, b) = (group("A"), group("B"));
    assert!(a.register([&a]).is_err());
    assert!(a.subgroups().is_empty());

    a.register([&b]).unwrap();
    assert!(b.register([&a]).is_err());
    assert_eq!(a.subgroups(), vec![b.clone()]);
    assert!(b.subgroups().is_empty());
}

#[test]
fn test_compile_twice_gives_same_commands() {
    let root = Group::builder("Root")
        .command("one", echo("one", vec![]))
        .command("two", echo("two", vec![]))
        .build()
        .unwrap();
    let sub = group("Sub");
    root.register([&sub]).unwrap();

    let names = |cmd: clap::Command| -> Vec<String> {
        cmd.get_subcommands().map(|c| c.get_name().to_string()).collect()
    };
    let first = names(root.compile().unwrap());
    let second = names(root.compile().unwrap());
    assert_eq!(first, vec!["one", "two", "sub"]);
    assert_eq!(first, second);
}

#[test]
fn test_nested_dispatch() {
    let root = group("Root");
    let sub = Group::builder("Sub")
        .command("add", echo("add", vec![Param::positional("x", TypeHint::Int)]))
        .build()
        .unwrap();
    root.register([&sub]).unwrap();
    assert_eq!(root.run(["sub", "add", "4"]).unwrap(), json!({"x": 4}));
    assert_eq!(root.run(["f"]).unwrap(), json!({}));
}

#[test]
fn test_explicit_config_wins_over_scalar_settings() {
    let base = Group::builder("Base").show_help_defaults(false).build().unwrap();
    let derived = Group::builder("Derived")
        .extends(&base)
        .show_help_defaults(true)
        .config(config(ConfigOverrides::new().show_help_defaults(false)))
        .command("f", echo("f", vec![Param::keyword("n", TypeHint::Int).with_default(1)]))
        .build()
        .unwrap();
    assert!(!derived.config().show_help_defaults());
    let help = derived.command("f").unwrap().to_clap().render_help().to_string();
    assert!(!help.contains("default:"), "{help}");

    let scalar = Group::builder("Scalar").extends(&base).show_help_defaults(true).build().unwrap();
    assert!(scalar.config().show_help_defaults());
}

#[test]
fn test_inherited_commands_come_first() {
    let parent = Group::builder("Parent")
        .command("a", echo("a", vec![]))
        .command("b", echo("b", vec![]))
        .build()
        .unwrap();
    let child = Group::builder("Child")
        .extends(&parent)
        .command("c", echo("c", vec![]))
        .command("a", echo("a", vec![Param::keyword("x", TypeHint::Int).with_default(0)]))
        .build()
        .unwrap();
    assert_eq!(child.command_names(), vec!["a", "b", "c"]);
    assert_eq!(child.run(["a", "--x", "3"]).unwrap(), json!({"x": 3}));
}

#[test]
fn test_group_help_lists_commands() {
    let root = Group::builder("Root")
        .doc("Tools for things.")
        .command("build", echo("build", vec![]).doc("Build it."))
        .build()
        .unwrap();
    let help = root.compile().unwrap().render_help().to_string();
    assert!(help.contains("Tools for things."), "{help}");
    assert!(help.contains("build"), "{help}");
    assert!(help.contains("Build it."), "{help}");
}

#[test]
fn test_from_dict_subgroup_rename_leaves_original() {
    let sub = group("Sub");
    let root = Group::from_dict(
        vec![("tools", Runnable::from(sub.clone()))],
        decree::GroupSettings::new().name("cli"),
        None,
    )
    .unwrap();
    assert_eq!(root.subgroup_names(), vec!["tools"]);
    assert_eq!(sub.name(), "sub");
    assert_eq!(root.run(["tools", "f"]).unwrap(), json!({}));
}
