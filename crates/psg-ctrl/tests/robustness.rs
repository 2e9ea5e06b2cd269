use proptest::prelude::*;
use psg_ctrl::constants::MAX_TONE_PERIOD;
use psg_ctrl::{PlayStatus, Slot, SlotConfig};

fn mml_text() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Ja-j0-9NRSTVMLOQIX<>&#+.\\-\\[\\]|$@C(), ~]{0,48}")
        .expect("valid regex")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arbitrary_text_stays_in_range(text in mml_text(), speed in 20u16..=500) {
        let mut slot = Slot::new(SlotConfig::new(1_789_772.5));
        if slot.set_mml(&text, 1).is_err() {
            return Ok(());
        }
        slot.set_speed_factor(speed);
        slot.play();

        for _ in 0..300 {
            slot.control_psg();
            let mut writes = Vec::new();
            slot.registers_mut().drain(|addr, data| writes.push((addr, data)));
            for (addr, data) in writes {
                prop_assert!(addr < 16);
                match addr {
                    1 | 3 | 5 => prop_assert!(data <= (MAX_TONE_PERIOD >> 8) as u8),
                    6 => prop_assert!(data < 32),
                    7 => prop_assert!(data <= 0x3F),
                    8..=10 => prop_assert!(data < 32),
                    _ => {}
                }
            }
            if slot.status() == PlayStatus::Ended {
                break;
            }
        }
    }

    #[test]
    fn silent_until_played(text in mml_text()) {
        let mut slot = Slot::new(SlotConfig::default());
        if slot.set_mml(&text, 0).is_ok() {
            for _ in 0..20 {
                slot.control_psg();
                prop_assert!(slot.registers().dirty().is_empty());
            }
        }
    }
}
