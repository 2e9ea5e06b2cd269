use psg_ctrl::{PlayStatus, Slot, SlotConfig, SlotMixer};

fn mixed_tick(
    mixer: &mut SlotMixer,
    main: &mut Slot<'_>,
    overlay: &mut Slot<'_>,
) -> Vec<(u8, u8)> {
    main.control_psg();
    overlay.control_psg();
    let playing = overlay.status() == PlayStatus::Playing;
    let mut writes = Vec::new();
    mixer.mix(
        main.registers_mut(),
        overlay.registers_mut(),
        playing,
        |addr, data| writes.push((addr, data)),
    );
    writes
}

fn se_slot() -> Slot<'static> {
    Slot::new(SlotConfig::default().with_channels(1).with_reverse(true))
}

#[test]
fn idle_overlay_is_transparent() -> anyhow::Result<()> {
    let text = "T150 L8 CDEFGAB>C, O3 L4 CEG, V10 L16 [4 G]";

    let mut solo = Slot::new(SlotConfig::default());
    solo.set_mml(text, 0)?;
    solo.play();

    let mut main = Slot::new(SlotConfig::default());
    main.set_mml(text, 0)?;
    main.play();
    let mut overlay = se_slot();
    let mut mixer = SlotMixer::new();

    for t in 0..200 {
        solo.control_psg();
        let mut expected = Vec::new();
        solo.registers_mut().drain(|addr, data| expected.push((addr, data)));

        let got = mixed_tick(&mut mixer, &mut main, &mut overlay);
        assert_eq!(got, expected, "tick {t}");
    }
    Ok(())
}

#[test]
fn effect_borrows_channel_c_and_hands_it_back() -> anyhow::Result<()> {
    let mut main = Slot::new(SlotConfig::default());
    main.set_mml("C1, E1, V9 G1", 0)?;
    main.play();
    let mut overlay = se_slot();
    overlay.set_mml("V14 O6 C16", 0)?;
    let mut mixer = SlotMixer::new();

    mixed_tick(&mut mixer, &mut main, &mut overlay);
    assert_eq!(mixer.physical()[10], 9);

    overlay.play();
    let writes = mixed_tick(&mut mixer, &mut main, &mut overlay);
    assert!(writes.contains(&(10, 14)));
    assert!(writes.iter().all(|w| w.0 != 8 && w.0 != 9));

    // A sixteenth note is 12 ticks; the effect mutes and then ends
    let mut returned = false;
    for _ in 0..20 {
        let writes = mixed_tick(&mut mixer, &mut main, &mut overlay);
        if writes.contains(&(10, 9)) {
            returned = true;
            break;
        }
    }
    assert!(returned);
    assert_eq!(mixer.physical()[7] & 0x24, 0x20);
    Ok(())
}
