use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use cocos_bridge::actions;
use cocos_bridge::logging::{init_logging, LoggingConfig};
use cocos_bridge::marshal::Menu;
use cocos_bridge::scheduler::{NodeScheduleExt, Repeat, Scheduler, Timing};
use cocos_headless::{FrameClock, HeadlessConfig, HeadlessEngine};

const FRAMES: u64 = 12;
const STEP_MS: u64 = 250;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig { timestamps: false, ..LoggingConfig::default() });

    println!();
    println!("  ╔════════════════════════════════════════╗");
    println!("  ║        COCOS BRIDGE  ·  HEADLESS       ║");
    println!("  ║   closures in, native callbacks out    ║");
    println!("  ╚════════════════════════════════════════╝");
    println!();

    let mut clock = FrameClock::from_config(&HeadlessConfig::fixed(Duration::from_millis(STEP_MS)));
    let mut scheduler = Scheduler::new(HeadlessEngine::new());

    // ── node-bound ────────────────────────────────────────────────────────
    let hero = scheduler.engine_mut().create_node();
    hero.enter();
    let offstage = scheduler.engine_mut().create_node();

    let hero_ticks = Rc::new(Cell::new(0u32));
    let seen = hero_ticks.clone();
    hero.schedule(&mut scheduler, move |_| seen.set(seen.get() + 1))?;

    let spawned = Rc::new(Cell::new(false));
    let flag = spawned.clone();
    hero.schedule_once(&mut scheduler, move |_| flag.set(true), 1.0)?;

    let offstage_ticks = Rc::new(Cell::new(0u32));
    let seen = offstage_ticks.clone();
    offstage.schedule(&mut scheduler, move |_| seen.set(seen.get() + 1))?;

    // ── context-bound ─────────────────────────────────────────────────────
    let pulses = Rc::new(RefCell::new(Vec::new()));
    let sink = pulses.clone();
    let pulse = scheduler.schedule_with(
        move |dt| sink.borrow_mut().push(dt),
        Timing::new().interval(0.5).repeat(Repeat::Forever),
        false,
    )?;

    for _ in 0..FRAMES {
        let frame = clock.tick();
        scheduler.engine_mut().tick(frame.dt);
        if frame.frame_index == FRAMES / 2 {
            scheduler.unschedule(&pulse)?;
        }
    }

    // ── actions and menus ─────────────────────────────────────────────────
    let engine = scheduler.engine_mut();
    let greeted = Rc::new(Cell::new(false));
    let done = greeted.clone();
    let action = actions::call_func(engine, move || done.set(true))?;
    engine.run_action(action, &hero)?;

    let picked = Rc::new(Cell::new(None));
    let sender = picked.clone();
    let play = actions::menu_item_image(engine, "play.png", "play-down.png", move |item| {
        sender.set(Some(item))
    })?;
    engine.activate(play)?;

    let counts = [engine.number(3), engine.number(2), engine.number(1)];
    let mut menu = Menu::new(engine);
    menu.align_items_in_columns(Some(&counts[..]))?;
    menu.align_items_in_rows(Some(&counts[..2]))?;
    let engine = menu.into_inner();

    println!("  frames          >  {FRAMES} at {STEP_MS}ms");
    println!("  hero ticks      >  {}", hero_ticks.get());
    println!("  wave spawned    >  {}", spawned.get());
    println!("  pulses          >  {:?}", pulses.borrow());
    println!("  offstage ticks  >  {}", offstage_ticks.get());
    println!("  call-func ran   >  {}", greeted.get());
    println!("  menu sender     >  {:?}", picked.get());
    for alignment in engine.alignments() {
        println!("  align {:<9} >  {:?}", format!("{:?}", alignment.axis), alignment.counts);
    }
    println!("  timers live     >  {}", engine.scheduled_count());
    println!();

    Ok(())
}
