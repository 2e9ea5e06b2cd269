use std::cell::Cell;
use std::rc::Rc;

use psgino::{PlayStatus, PsgPlayer, Psgino, PsginoZ, RegisterWriter, SlotConfig};

#[derive(Default)]
struct Recorder {
    writes: Vec<(u8, u8)>,
}

impl RegisterWriter for Recorder {
    fn write_register(&mut self, addr: u8, data: u8) {
        self.writes.push((addr, data));
    }
}

impl Recorder {
    fn take(&mut self) -> Vec<(u8, u8)> {
        std::mem::take(&mut self.writes)
    }
}

fn config() -> SlotConfig {
    SlotConfig::new(2_000_000.0)
}

#[test]
fn reset_runs_hook_and_rewrites_everything() -> anyhow::Result<()> {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);

    let mut player = Psgino::new(config(), Recorder::default());
    player.set_reset_hook(move || seen.set(seen.get() + 1));
    player.set_mml("C", 0)?;
    player.play();
    player.proc();
    player.writer_mut().take();

    player.reset();
    assert_eq!(calls.get(), 1);
    let expected: Vec<(u8, u8)> = (0..16u8)
        .map(|addr| (addr, if addr == 7 { 0x3F } else { 0 }))
        .collect();
    assert_eq!(player.writer_mut().take(), expected);
    assert_eq!(player.status(), PlayStatus::Stopped);

    // Text was dropped; ticking does nothing
    player.play();
    player.proc();
    assert!(player.writer_mut().take().is_empty());
    Ok(())
}

#[test]
fn psgino_plays_to_end() -> anyhow::Result<()> {
    let mut player = Psgino::new(config(), Recorder::default());
    player.set_mml("L8 CDE", 0)?;
    player.play();

    let mut ticks = 0;
    while ticks < 1000 {
        player.proc();
        if player.status() == PlayStatus::Ended {
            break;
        }
        ticks += 1;
    }
    assert_eq!(ticks, 75);

    let writes = player.into_writer().writes;
    assert_eq!(writes.last(), Some(&(7, 0x3F)));
    Ok(())
}

#[test]
fn trait_object_dispatch() -> anyhow::Result<()> {
    let mut single = Psgino::new(config(), Recorder::default());
    single.set_mml("C", 0)?;
    let mut dual = PsginoZ::new(config(), Recorder::default());
    dual.set_mml("C", 0)?;

    let players: [&mut dyn PsgPlayer; 2] = [&mut single, &mut dual];
    for player in players {
        player.play();
        player.proc();
        assert!(player.is_playing());
    }
    assert_eq!(single.writer().writes, dual.writer().writes);
    Ok(())
}

#[test]
fn sound_effect_overrides_channel_c() -> anyhow::Result<()> {
    let mut player = PsginoZ::new(config(), Recorder::default());
    player.set_mml("V8 C1, V8 E1, V8 G1", 0)?;
    player.set_se_mml("V15 O6 C16", 0)?;
    player.play();
    player.proc();
    player.writer_mut().take();

    player.play_se();
    player.proc();
    assert_eq!(player.se_status(), PlayStatus::Playing);
    let writes = player.writer_mut().take();
    assert!(writes.contains(&(10, 15)));
    assert!(writes.iter().all(|w| w.0 != 8 && w.0 != 9));

    while player.se_status() == PlayStatus::Playing {
        player.proc();
    }
    assert_eq!(player.se_status(), PlayStatus::Ended);
    assert!(player.writer().writes.contains(&(10, 8)));
    assert!(player.is_playing());
    Ok(())
}

#[test]
fn se_callback_reports_channel_c() -> anyhow::Result<()> {
    let value = Rc::new(Cell::new((0u8, 0i32)));
    let sink = Rc::clone(&value);

    let mut player = PsginoZ::new(config(), Recorder::default());
    player.set_se_mml("@C42 C", 0)?;
    player.set_se_user_callback(move |ch, v| sink.set((ch, v)));
    player.play_se();
    player.proc();
    assert_eq!(value.get(), (2, 42));
    Ok(())
}
