use chrono::{Local, NaiveDate};
use std::error::Error;
use wetterweiser::{
    ForecastStrategy, ManualEntry, MemoryRemote, PushOutcome, RemoteSync, Scope, Session,
};

fn main() -> Result<(), Box<dyn Error>> {
    let sync = RemoteSync::builder().transport(MemoryRemote::new()).build();
    let mut session = Session::new(sync);

    let reload = session.reload(true)?;
    if let Some(message) = reload.missing {
        println!("remote document missing ({message}), starting empty");
    }

    let today = Local::now().date_naive();
    let mut rng = rand::rng();
    let simulated = session.add_simulated("Rostock", 14, today, &mut rng, false)?;
    println!("simulated {} days", simulated.added);

    let mut entry = ManualEntry::template(today);
    entry.location = "Rostock".to_string();
    let manual = session.add_manual(&[entry], false)?;
    println!(
        "manual entry: {} added, {} conflicts",
        manual.added,
        manual.conflicts.len()
    );

    // someone else saves in between
    session.sync().transport().external_write("[]");
    let mut later = ManualEntry::template(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(today));
    later.location = "Rostock".to_string();
    let report = session.add_manual(&[later], true)?;
    match report.push.map(|p| p.outcome) {
        Some(PushOutcome::Conflict { expected, found }) => {
            println!("not saved, remote changed: expected {expected:?}, found {found:?}")
        }
        other => println!("push: {other:?}"),
    }

    let analytics = session.analytics();
    let forecast = analytics.forecast(
        &Scope::location("Rostock"),
        3,
        ForecastStrategy::Trend,
        today,
        &mut rng,
    );
    for ((day, temperature), precipitation) in forecast
        .days
        .iter()
        .zip(&forecast.temperature)
        .zip(&forecast.precipitation)
    {
        println!("{day}: {temperature} °C, {precipitation} mm");
    }
    Ok(())
}
