use decree::{config, Command, ConfigOverrides, DecreeError, FunctionSpec, Param, ParamOverride, Signature, TypeHint};
use decree::typing::Constraints;
use rstest::rstest;
use serde_json::{json, Value};

fn function(name: &str, params: Vec<Param>) -> FunctionSpec {
    FunctionSpec::new(name, Signature::new(params).unwrap(), |_, call| Ok(call.to_value()))
}

#[test]
fn test_positional_int_and_required_flag() {
    let f = FunctionSpec::new(
        "f",
        Signature::new(vec![
            Param::positional("arg1", TypeHint::Int),
            Param::keyword("arg2", TypeHint::Bool),
        ])
        .unwrap(),
        |_, call| Ok(json!([call.get::<i64>("arg1")?, call.get::<bool>("arg2")?])),
    );
    let command = Command::new(f).unwrap();

    let arguments: Vec<_> = command.arguments().collect();
    assert_eq!(arguments.len(), 1);
    assert_eq!(arguments[0].name, "arg1");
    assert!(arguments[0].required);

    let options: Vec<_> = command.options().collect();
    assert_eq!(options.len(), 1);
    assert!(options[0].required);
    assert_eq!(options[0].opts(), vec!["--arg2"]);
    assert_eq!(options[0].secondary_opts(), vec!["--no-arg2"]);

    assert_eq!(command.run(["3", "--arg2"]).unwrap(), json!([3, true]));
    assert_eq!(command.run(["3", "--no-arg2"]).unwrap(), json!([3, false]));
}

#[test]
fn test_positive_int_rejects_out_of_range_by_flag() {
    let command = Command::new(function("f", vec![Param::keyword("opt", TypeHint::positive_int())])).unwrap();
    let option = command.options().next().unwrap();
    let range = option.host_type.as_ref().and_then(|host| host.range()).unwrap();
    assert_eq!(range.describe(), "x>0");

    let err = command.run(["--opt", "-1"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    let message = err.to_string();
    assert!(message.contains("--opt"), "{message}");
    assert!(message.contains("-1 is not in the range x>0."), "{message}");
    assert_eq!(command.run(["--opt", "5"]).unwrap(), json!({"opt": 5}));
}

#[test]
fn test_environment_secret_is_redacted() {
    let f = function(
        "login",
        vec![Param::keyword("token", TypeHint::constr(Constraints::new().min_length(8)))],
    )
    .env("token", "DECREE_IT_LOGIN_TOKEN")
    .unwrap();
    let command = Command::new(f).unwrap();

    let err = command.run(["--token", "abc"]).unwrap_err();
    assert!(matches!(err, DecreeError::Usage { .. }));
    let message = err.to_string();
    assert!(message.starts_with("1 validation error for command 'login'"), "{message}");
    assert!(message.contains("--token"), "{message}");
    assert!(message.contains("[input_value=hidden]"), "{message}");
    assert!(!message.contains("'abc'"), "{message}");
}

#[test]
fn test_masked_override_is_redacted() {
    let f = function(
        "login",
        vec![Param::keyword("password", TypeHint::constr(Constraints::new().min_length(8)))],
    )
    .with_override(ParamOverride::new(clap::Arg::new("password").long("password")).hide_input(true));
    let command = Command::new(f).unwrap();

    let err = command.run(["--password", "abc"]).unwrap_err();
    assert!(matches!(err, DecreeError::Usage { .. }));
    let message = err.to_string();
    assert!(message.starts_with("1 validation error for command 'login'"), "{message}");
    assert!(message.contains("--password"), "{message}");
    assert!(message.contains("String should have at least 8 characters"), "{message}");
    assert!(message.contains("[input_value=hidden]"), "{message}");
    assert!(!message.contains("'abc'"), "{message}");

    assert_eq!(
        command.run(["--password", "correct horse"]).unwrap(),
        json!({"password": "correct horse"})
    );
}

#[rstest]
#[case(0, 0)]
#[case(2, 0)]
#[case(0, 3)]
#[case(2, 3)]
fn test_arguments_and_options_keep_declaration_order(#[case] n: usize, #[case] m: usize) {
    for with_context in [false, true] {
        let mut params = Vec::new();
        if with_context {
            params.push(Param::context());
        }
        params.extend((0..n).map(|i| Param::positional(format!("a{i}"), TypeHint::Int)));
        params.extend((0..m).map(|i| Param::keyword(format!("o{i}"), TypeHint::Str).with_default("x")));
        let command = Command::new(function("f", params)).unwrap();

        let arguments: Vec<String> = command.arguments().map(|p| p.name.clone()).collect();
        let options: Vec<String> = command.options().map(|p| p.name.clone()).collect();
        assert_eq!(arguments, (0..n).map(|i| format!("a{i}")).collect::<Vec<_>>());
        assert_eq!(options, (0..m).map(|i| format!("o{i}")).collect::<Vec<_>>());
        assert_eq!(command.passes_context(), with_context);
    }
}

#[rstest]
#[case("verbose")]
#[case("dry_run")]
fn test_boolean_options_have_two_flags(#[case] name: &str) {
    let command = Command::new(function(
        "f",
        vec![Param::keyword(name, TypeHint::Bool).with_default(false)],
    ))
    .unwrap();
    let option = command.options().next().unwrap();
    let flags: Vec<&str> = option.opts().into_iter().chain(option.secondary_opts()).collect();
    let long = format!("--{}", name.replace('_', "-"));
    let negated = format!("--no-{}", name.replace('_', "-"));
    assert_eq!(flags, vec![long.as_str(), negated.as_str()]);
}

#[rstest]
#[case(true)]
#[case(false)]
fn test_help_shows_default_only_when_enabled(#[case] show: bool) {
    let command = Command::builder(function(
        "f",
        vec![Param::keyword("limit", TypeHint::Int).with_default(10)],
    ))
    .config(config(ConfigOverrides::new().show_help_defaults(show)))
    .build()
    .unwrap();
    let help = command.to_clap().render_help().to_string();
    assert_eq!(help.contains("[default: 10]"), show, "{help}");
    assert_eq!(help.contains("default:"), show, "{help}");
}

#[test]
fn test_help_exits_zero() {
    let command = Command::new(function("f", vec![Param::positional("x", TypeHint::Int)])).unwrap();
    let err = command.run(["--help"]).unwrap_err();
    assert!(err.is_display());
    assert_eq!(err.exit_code(), 0);
}

#[test]
fn test_counting_option() {
    let command = Command::new(function(
        "f",
        vec![Param::keyword("verbose", TypeHint::counter()).with_default(0)],
    ))
    .unwrap()
    .renamed("g");
    assert_eq!(command.run(["--verbose", "--verbose"]).unwrap(), json!({"verbose": 2}));
    assert_eq!(command.run(Vec::<String>::new()).unwrap(), json!({"verbose": 0}));
}

#[test]
fn test_counting_positional_is_rejected() {
    let err = Command::new(function("f", vec![Param::positional("v", TypeHint::counter())])).unwrap_err();
    assert!(err.message().starts_with("Counting may only be used"));
}

#[test]
fn test_handler_errors_exit_one() {
    let f = FunctionSpec::new("boom", Signature::new(vec![]).unwrap(), |_, _| -> anyhow::Result<Value> {
        anyhow::bail!("exploded")
    });
    let err = Command::new(f).unwrap().run(Vec::<String>::new()).unwrap_err();
    assert!(matches!(err, DecreeError::Handler(_)));
    assert_eq!(err.exit_code(), 1);
}
