//! Public API tests.
//!
//! These tests do not require libbitcoinkernel.

use bitcoinkernel::{
    ChainType, Error, LogCategory, LogLevel, LogParser, LoggingOptions, NotificationCallbacks,
    ScriptVerifyError, ScriptVerifyFlags, SynchronizationState, ValidationCallbacks,
    ValidationMode,
};

#[test]
fn test_script_verify_flags() {
    let flags = ScriptVerifyFlags::P2SH | ScriptVerifyFlags::WITNESS;
    assert!(flags.contains(ScriptVerifyFlags::P2SH));
    assert!(!flags.contains(ScriptVerifyFlags::TAPROOT));
    assert!(flags.is_valid());

    assert!(ScriptVerifyFlags::ALL.contains(ScriptVerifyFlags::ALL_PRE_TAPROOT));
    assert!(!ScriptVerifyFlags::ALL_PRE_TAPROOT.contains(ScriptVerifyFlags::TAPROOT));
    assert_eq!(
        ScriptVerifyFlags::ALL_PRE_TAPROOT | ScriptVerifyFlags::TAPROOT,
        ScriptVerifyFlags::ALL
    );
    assert_eq!(ScriptVerifyFlags::default(), ScriptVerifyFlags::NONE);

    // Bit 1 is not assigned to any rule
    assert!(!ScriptVerifyFlags::from_bits(1 << 1).is_valid());
}

#[test]
fn test_enum_conversions() {
    assert_eq!(ChainType::default(), ChainType::Mainnet);
    assert_eq!(u8::from(ChainType::Regtest), 4);
    assert_eq!(ChainType::try_from(2), Ok(ChainType::Testnet4));
    assert_eq!(ChainType::try_from(42), Err(42));

    assert_eq!(SynchronizationState::try_from(0), Ok(SynchronizationState::InitReindex));
    assert_eq!(ValidationMode::try_from(1), Ok(ValidationMode::Invalid));
    assert_eq!(u8::from(LogCategory::All), 0);
    assert_eq!(u8::from(LogLevel::Trace), 0);
}

#[test]
fn test_error_display() {
    let err = Error::IndexOutOfBounds { index: 3, len: 1 };
    assert_eq!(err.to_string(), "index 3 out of bounds (length 1)");
    assert!(err.is_out_of_bounds());

    let err: Error = ScriptVerifyError::SpentOutputsMismatch.into();
    assert!(err.is_script_verify());
    assert_eq!(err.to_string(), "spent outputs do not match transaction inputs");
}

#[test]
fn test_callback_builders() {
    let notifications = NotificationCallbacks::new()
        .on_block_tip(|_, _, _| {})
        .on_fatal_error(|_| {});
    let s = format!("{:?}", notifications);
    assert!(s.contains("block_tip: true"), "unexpected debug output: {}", s);
    assert!(s.contains("header_tip: false"), "unexpected debug output: {}", s);

    let validation = ValidationCallbacks::new().on_block_connected(|_, _| {});
    let s = format!("{:?}", validation);
    assert!(s.contains("block_connected: true"), "unexpected debug output: {}", s);
}

#[test]
fn test_logging_options_default() {
    let options = LoggingOptions::default();
    assert!(options.log_timestamps);
    assert!(!options.log_time_micros);
    assert!(!options.log_threadnames);
    assert!(!options.log_sourcelocations);
    assert!(!options.always_print_category_levels);
}

#[test]
fn test_log_parser_thread_and_category() {
    let options = LoggingOptions {
        log_timestamps: false,
        log_threadnames: true,
        always_print_category_levels: true,
        ..LoggingOptions::default()
    };
    let parser = LogParser::new(options).expect("parser should build");

    let entry = parser
        .parse("[scheduler] [validation:info] UpdateTip: new best=0f9188f1\n")
        .expect("line should parse");
    assert_eq!(entry.thread.as_deref(), Some("scheduler"));
    assert_eq!(entry.category.as_deref(), Some("validation"));
    assert_eq!(entry.level, log::Level::Info);
    assert_eq!(entry.message, "UpdateTip: new best=0f9188f1");

    // Category level is required with these options
    assert!(parser.parse("[scheduler] UpdateTip").is_none());
}
