use apifuzz::{CheckerDirective, EngineConfig, EngineRun};

fn idx(argv: &[String], needle: &str) -> Option<usize> {
    argv.iter().position(|s| s == needle)
}

fn value_of<'a>(argv: &'a [String], flag: &str) -> Option<&'a str> {
    idx(argv, flag).and_then(|i| argv.get(i + 1)).map(String::as_str)
}

fn base_config() -> EngineConfig {
    EngineConfig::default()
        .grammar_file("/work/grammar.py")
        .dictionary_file("/work/dict.json")
}

#[test]
fn shared_flags_precede_run_specific_flags() {
    let argv = base_config()
        .target_ip("10.0.0.1")
        .target_port(8443)
        .host("api.example.com")
        .no_ssl(true)
        .path_regex("^/v2/")
        .producer_timing_delay(3)
        .settings_file("/work/settings.json")
        .argv(EngineRun::Fuzz, "0.2.0");

    assert_eq!(value_of(&argv, "--grammar_file"), Some("/work/grammar.py"));
    assert_eq!(value_of(&argv, "--dictionary_file"), Some("/work/dict.json"));
    assert_eq!(value_of(&argv, "--set_version"), Some("0.2.0"));
    assert_eq!(value_of(&argv, "--target_ip"), Some("10.0.0.1"));
    assert_eq!(value_of(&argv, "--target_port"), Some("8443"));
    assert_eq!(value_of(&argv, "--host"), Some("api.example.com"));
    assert_eq!(value_of(&argv, "--path_regex"), Some("^/v2/"));
    assert_eq!(value_of(&argv, "--producer_timing_delay"), Some("3"));
    assert_eq!(value_of(&argv, "--settings"), Some("/work/settings.json"));
    assert!(idx(&argv, "--no_ssl").is_some());

    let mode = idx(&argv, "--fuzzing_mode").expect("fuzzing mode present");
    for flag in ["--grammar_file", "--include_user_agent", "--no_tokens_in_logs"] {
        let i = idx(&argv, flag).unwrap_or_else(|| panic!("missing flag {flag}"));
        assert!(i < mode, "flag {flag} should precede the run-specific tail");
    }
}

#[test]
fn smoke_test_omits_unset_time_budget() {
    let argv = base_config().argv(EngineRun::SmokeTest, "0.2.0");
    assert_eq!(value_of(&argv, "--fuzzing_mode"), Some("directed-smoke-test"));
    assert!(idx(&argv, "--time_budget").is_none());

    let argv = base_config()
        .time_budget_hours(0.5)
        .argv(EngineRun::SmokeTest, "0.2.0");
    assert_eq!(value_of(&argv, "--time_budget"), Some("0.5"));
}

#[test]
fn fuzz_always_carries_a_time_budget() {
    let argv = base_config().argv(EngineRun::Fuzz, "0.2.0");
    assert_eq!(value_of(&argv, "--fuzzing_mode"), Some("bfs-cheap"));
    assert_eq!(value_of(&argv, "--time_budget"), Some("1"));

    let argv = base_config()
        .time_budget_hours(2.5)
        .argv(EngineRun::Fuzz, "0.2.0");
    assert_eq!(value_of(&argv, "--time_budget"), Some("2.5"));
}

#[test]
fn replay_passes_only_the_log_in_its_tail() {
    let argv = base_config()
        .replay_log("/work/replay.txt")
        .argv(EngineRun::Replay, "0.2.0");
    assert_eq!(value_of(&argv, "--replay_log"), Some("/work/replay.txt"));
    assert!(idx(&argv, "--fuzzing_mode").is_none());
    assert!(idx(&argv, "--time_budget").is_none());
}

#[test]
fn checker_directives_keep_user_order() {
    let argv = base_config()
        .push_checkers(CheckerDirective::enable(["leakagerule", "useafterfree"]))
        .push_checkers(CheckerDirective::disable(["payloadbody"]))
        .argv(EngineRun::SmokeTest, "0.2.0");

    let enable = idx(&argv, "--enable_checkers").expect("enable flag");
    assert_eq!(argv[enable + 1], "leakagerule");
    assert_eq!(argv[enable + 2], "useafterfree");
    let disable = idx(&argv, "--disable_checkers").expect("disable flag");
    assert!(enable < disable);
    assert_eq!(argv[disable + 1], "payloadbody");
}

#[test]
fn token_refresh_emits_both_flags_together() {
    let argv = base_config()
        .token_refresh_command("sh get-token.sh")
        .argv(EngineRun::SmokeTest, "0.2.0");
    assert_eq!(value_of(&argv, "--token_refresh_interval"), Some("300"));
    assert_eq!(value_of(&argv, "--token_refresh_command"), Some("sh get-token.sh"));

    let argv = base_config().argv(EngineRun::SmokeTest, "0.2.0");
    assert!(idx(&argv, "--token_refresh_interval").is_none());
    assert!(idx(&argv, "--token_refresh_command").is_none());
}

#[test]
fn fixed_flags_are_always_present() {
    for run in [EngineRun::SmokeTest, EngineRun::Fuzz, EngineRun::Replay] {
        let argv = base_config().argv(run, "0.2.0");
        assert!(idx(&argv, "--include_user_agent").is_some());
        assert!(idx(&argv, "--no_tokens_in_logs").is_some());
    }
}
