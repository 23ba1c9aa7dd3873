#![no_std]

use lora_radio::{
    config::radio::RadioConfig,
    controller::{Action, RadioController},
    flag::ActionFlag,
    radio::traits::RadioError,
};

use mock::{MockRadio, RecordingSink};

// Test helper to create a controller around a scriptable radio
fn create_controller(
    flag: &'static ActionFlag,
) -> RadioController<MockRadio, RecordingSink> {
    RadioController::new(MockRadio::new(), flag, RecordingSink::new())
}

#[test]
fn test_begin_applies_configuration_in_fixed_order() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);

    assert!(controller.begin(RadioConfig::default()));
    assert!(controller.is_initialized());
    assert_eq!(controller.runtime_state().last_action, Action::Standby);
    assert_eq!(
        controller.radio().calls.as_slice(),
        [
            "init",
            "bind_completion",
            "set_frequency",
            "set_output_power",
            "set_spreading_factor",
            "set_coding_rate",
            "set_bandwidth",
            "set_sync_word",
            "set_rf_switch_ctrl",
        ]
    );
}

#[test]
fn test_begin_fails_when_chip_init_fails() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    controller.radio_mut().fail_on("init", RadioError::Spi);

    assert!(!controller.begin(RadioConfig::default()));
    assert!(!controller.is_initialized());
    assert!(controller.sink().errors[0].contains("Initialization failed"));
    // Nothing past the failed init is attempted
    assert_eq!(controller.radio().call_count("bind_completion"), 0);
    assert_eq!(controller.radio().call_count("set_frequency"), 0);
}

#[test]
fn test_configure_stops_at_first_invalid_parameter() {
    static FLAG: ActionFlag = ActionFlag::new();
    let cases: [(&'static str, RadioError, &'static str); 6] = [
        ("set_frequency", RadioError::InvalidFrequency, "set_output_power"),
        ("set_output_power", RadioError::InvalidOutputPower, "set_spreading_factor"),
        ("set_spreading_factor", RadioError::InvalidSpreadingFactor, "set_coding_rate"),
        ("set_coding_rate", RadioError::InvalidCodingRate, "set_bandwidth"),
        ("set_bandwidth", RadioError::InvalidBandwidth, "set_sync_word"),
        ("set_sync_word", RadioError::InvalidSyncWord, "set_rf_switch_ctrl"),
    ];

    for (failing, code, next_in_chain) in cases {
        let mut controller = create_controller(&FLAG);
        controller.radio_mut().fail_on(failing, code);

        assert!(!controller.begin(RadioConfig::default()));
        assert!(!controller.is_initialized());
        // The chain ends on the offending parameter
        assert_eq!(*controller.radio().calls.last().unwrap(), failing);
        assert_eq!(controller.radio().call_count(next_in_chain), 0);
        // The parameter is named to the sink before the generic failure
        assert!(controller.sink().errors[0].contains("invalid"));
    }
}

#[test]
fn test_configure_tolerates_transport_errors_on_parameter_steps() {
    // Only the parameter-specific invalid code stops the chain; a bus
    // fault on a setter is passed over
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    controller.radio_mut().fail_on("set_frequency", RadioError::Spi);

    assert!(controller.begin(RadioConfig::default()));
    assert!(controller.is_initialized());
    assert_eq!(controller.radio().call_count("set_rf_switch_ctrl"), 1);
}

#[test]
fn test_rf_switch_step_is_fatal_on_any_error() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    controller
        .radio_mut()
        .fail_on("set_rf_switch_ctrl", RadioError::Spi);

    assert!(!controller.begin(RadioConfig::default()));
    assert!(!controller.is_initialized());
    assert!(controller.sink().errors[0].contains("RF switch"));
}

#[test]
fn test_operations_before_begin_are_inert() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);

    assert!(!controller.transmit_bytes(b"hello"));
    assert!(!controller.receive_bytes());
    // Neither the flag nor the runtime state was touched
    assert!(FLAG.is_set());
    assert_eq!(controller.runtime_state().last_action, Action::Standby);
    assert!(controller.radio().calls.is_empty());
    // Precondition failures are silent
    assert!(controller.sink().errors.is_empty());
}

#[test]
fn test_transmit_starts_send_and_holds_slot() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    assert!(controller.begin(RadioConfig::default()));

    assert!(controller.transmit_bytes(b"ping"));
    assert_eq!(controller.runtime_state().last_action, Action::Transmit);
    assert_eq!(controller.radio().last_tx(), Some(&b"ping"[..]));

    // The send is still in flight: a second transmit is rejected without
    // starting another one, and silently
    assert!(!controller.transmit_bytes(b"pong"));
    assert_eq!(controller.radio().call_count("start_transmit"), 1);
    assert!(controller.sink().errors.is_empty());

    // Once the interrupt lands, the slot frees up
    FLAG.signal();
    assert!(controller.transmit_bytes(b"pong"));
    assert_eq!(controller.radio().call_count("start_transmit"), 2);
}

#[test]
fn test_transmit_overrides_stale_non_transmit_action() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    assert!(controller.begin(RadioConfig::default()));

    // Arm listening; the slot is now held and no interrupt ever arrives
    assert!(!controller.receive_bytes());
    assert_eq!(controller.runtime_state().last_action, Action::Receive);
    assert!(!FLAG.is_set());

    // Outbound traffic takes the slot anyway
    assert!(controller.transmit_bytes(b"urgent"));
    assert_eq!(controller.runtime_state().last_action, Action::Transmit);
    assert_eq!(controller.radio().call_count("start_transmit"), 1);
}

#[test]
fn test_receive_never_overrides_a_held_slot() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    assert!(controller.begin(RadioConfig::default()));

    assert!(!controller.receive_bytes());
    // Second call finds the slot held and does nothing
    assert!(!controller.receive_bytes());
    assert_eq!(controller.radio().call_count("standby"), 1);
    assert_eq!(controller.radio().call_count("start_receive"), 1);
    assert!(controller.sink().errors.is_empty());
}

#[test]
fn test_receive_harvests_on_second_call_only() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    assert!(controller.begin(RadioConfig::default()));

    // A packet already pending before the first call is not harvested;
    // the first call only arms listening
    controller.radio_mut().stage_packet(b"early");
    assert!(!controller.receive_bytes());
    assert_eq!(controller.radio().call_count("read_data"), 0);

    // Interrupt fires, second call harvests
    FLAG.signal();
    controller.radio_mut().stage_packet(&[1, 2, 3, 4, 5]);
    assert!(controller.receive_bytes());
    assert_eq!(controller.received_data().payload.len(), 5);
    assert_eq!(controller.received_data().payload.as_slice(), &[1, 2, 3, 4, 5]);
    assert_eq!(controller.received_data().rssi, -50.0);
    assert_eq!(controller.received_data().snr, 10.0);
    assert_eq!(controller.received_data().frequency, 434.5);

    // Nothing new over the air: the read comes back empty and the call
    // reports false
    FLAG.signal();
    controller.radio_mut().stage_packet(&[]);
    assert!(!controller.receive_bytes());
    assert_eq!(controller.received_data().payload.len(), 0);
}

#[test]
fn test_failed_harvest_still_publishes_record() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    assert!(controller.begin(RadioConfig::default()));

    assert!(!controller.receive_bytes());
    FLAG.signal();
    controller.radio_mut().stage_packet(&[9, 9, 9]);
    controller.radio_mut().fail_on("read_data", RadioError::Crc);

    assert!(!controller.receive_bytes());
    // Last-known values are published regardless, with the failure
    // visible in the recorded status and on the sink
    assert_eq!(controller.received_data().payload.len(), 3);
    assert_eq!(controller.runtime_state().last_status, Err(RadioError::Crc));
    assert!(controller.sink().errors[0].contains("Receiving failed"));
    // Listening was still re-armed
    assert_eq!(controller.runtime_state().last_action, Action::Receive);
    assert_eq!(controller.radio().call_count("start_receive"), 2);
}

#[test]
fn test_transmit_failure_is_reported_and_recovers() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    assert!(controller.begin(RadioConfig::default()));
    controller
        .radio_mut()
        .fail_on("start_transmit", RadioError::Spi);

    assert!(!controller.transmit_bytes(b"lost"));
    assert_eq!(controller.runtime_state().last_status, Err(RadioError::Spi));
    assert_eq!(controller.runtime_state().last_action, Action::Standby);
    assert!(controller.sink().errors[0].contains("Starting transmit failed"));

    // The slot was claimed and never released by an interrupt, but the
    // stale-action override lets the next send through
    controller.radio_mut().fail = None;
    assert!(controller.transmit_bytes(b"retry"));
    assert_eq!(controller.radio().last_tx(), Some(&b"retry"[..]));
}

#[test]
fn test_frequency_correction_tracks_drift() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    let config = RadioConfig {
        frequency_correction: true,
        ..RadioConfig::default()
    };
    assert!(controller.begin(config));
    assert_eq!(controller.runtime_state().frequency, 434.5);

    assert!(!controller.receive_bytes());
    FLAG.signal();
    controller.radio_mut().stage_packet(b"drifted");
    controller.radio_mut().frequency_error = 2_000_000.0;

    assert!(controller.receive_bytes());
    // The record keeps the frequency the packet was received at; the
    // tracked operating frequency moves under it
    assert_eq!(controller.received_data().frequency, 434.5);
    assert_eq!(controller.runtime_state().frequency, 432.5);
    assert_eq!(*controller.radio().frequencies.last().unwrap(), 432.5);
}

#[test]
fn test_frequency_correction_disabled_leaves_frequency_alone() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    assert!(controller.begin(RadioConfig::default()));

    assert!(!controller.receive_bytes());
    FLAG.signal();
    controller.radio_mut().stage_packet(b"drifted");
    controller.radio_mut().frequency_error = 2_000_000.0;

    assert!(controller.receive_bytes());
    assert_eq!(controller.runtime_state().frequency, 434.5);
    // No correction means no retune: the only set_frequency call was
    // begin's
    assert_eq!(controller.radio().call_count("set_frequency"), 1);
}

#[test]
fn test_frequency_correction_rejected_retune_is_not_adopted() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    let config = RadioConfig {
        frequency_correction: true,
        ..RadioConfig::default()
    };
    assert!(controller.begin(config));

    assert!(!controller.receive_bytes());
    FLAG.signal();
    controller.radio_mut().stage_packet(b"drifted");
    controller.radio_mut().frequency_error = 2_000_000.0;
    controller
        .radio_mut()
        .fail_on("set_frequency", RadioError::InvalidFrequency);

    assert!(controller.receive_bytes());
    assert_eq!(controller.runtime_state().frequency, 434.5);
}

#[test]
fn test_frequency_correction_adopts_on_transport_error() {
    // Only an invalid-frequency answer vetoes adoption; a bus fault on
    // the retune does not
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    let config = RadioConfig {
        frequency_correction: true,
        ..RadioConfig::default()
    };
    assert!(controller.begin(config));

    assert!(!controller.receive_bytes());
    FLAG.signal();
    controller.radio_mut().stage_packet(b"drifted");
    controller.radio_mut().frequency_error = 2_000_000.0;
    controller.radio_mut().fail_on("set_frequency", RadioError::Spi);

    assert!(controller.receive_bytes());
    assert_eq!(controller.runtime_state().frequency, 432.5);
}

#[test]
fn test_reconfigure_requires_begin() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);

    assert!(!controller.reconfigure(RadioConfig::default()));
    assert!(controller.radio().calls.is_empty());
}

#[test]
fn test_reconfigure_reruns_chain_and_resets_tracked_frequency() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);
    let config = RadioConfig {
        frequency_correction: true,
        ..RadioConfig::default()
    };
    assert!(controller.begin(config));

    // Drift the tracked frequency away from nominal
    assert!(!controller.receive_bytes());
    FLAG.signal();
    controller.radio_mut().stage_packet(b"drifted");
    controller.radio_mut().frequency_error = 2_000_000.0;
    assert!(controller.receive_bytes());
    assert_eq!(controller.runtime_state().frequency, 432.5);

    assert!(controller.reconfigure(config));
    assert_eq!(controller.runtime_state().frequency, 434.5);
    // The full chain ran again
    assert_eq!(controller.radio().call_count("set_sync_word"), 2);
    assert_eq!(controller.radio().call_count("set_rf_switch_ctrl"), 2);
}

#[test]
fn test_begin_again_reapplies_configuration() {
    static FLAG: ActionFlag = ActionFlag::new();
    let mut controller = create_controller(&FLAG);

    assert!(controller.begin(RadioConfig::default()));
    assert!(controller.begin(RadioConfig::new(868.0, 0x12)));
    assert!(controller.is_initialized());
    assert_eq!(controller.radio().call_count("init"), 2);
    assert_eq!(*controller.radio().frequencies.last().unwrap(), 868.0);
}
