use std::io::{self, Write};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveTime, Utc};
use mnemo::stats;
use mnemo::{Config, Rating, Storage, StudyMode, StudySession};

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load()?;
    config.ensure_dirs()?;
    let mut storage = Storage::open(&config.db_path)
        .with_context(|| format!("Failed to open database: {}", config.db_path.display()))?;

    loop {
        print_decks(&storage)?;
        println!("(s)tudy deck  (a)ll decks  (n)ew deck  (c)ards add  (d)elete deck  s(t)ats  (q)uit");

        let choice = match prompt("> ") {
            Ok(choice) => choice,
            Err(_) => break,
        };
        let result = match choice.as_str() {
            "s" => study(&mut storage, &config, true),
            "a" => study(&mut storage, &config, false),
            "n" => new_deck(&storage),
            "c" => add_cards(&storage),
            "d" => delete_deck(&mut storage),
            "t" => show_stats(&storage, &config),
            "q" => break,
            "" => continue,
            other => {
                println!("Unknown option '{other}'");
                continue;
            }
        };
        if let Err(e) = result {
            eprintln!("Error: {e}");
        }
    }

    Ok(())
}

fn print_decks(storage: &Storage) -> Result<()> {
    let decks = storage.deck_stats()?;
    println!();
    if decks.is_empty() {
        println!("No decks yet.");
    } else {
        for entry in &decks {
            println!(
                "  [{}] {} - {} cards, {} due",
                entry.deck.id, entry.deck.name, entry.total_cards, entry.due_cards
            );
        }
    }
    println!();

    Ok(())
}

fn study(storage: &mut Storage, config: &Config, pick_deck: bool) -> Result<()> {
    let deck_id = if pick_deck {
        match select_deck(storage)? {
            Some(id) => Some(id),
            None => return Ok(()),
        }
    } else {
        None
    };

    let Some(mut session) = StudySession::begin(storage, config, deck_id, StudyMode::Flip)? else {
        println!("Nothing due right now.");
        return Ok(());
    };

    println!(
        "Studying {} cards. Rate your recall 1-4 (1=again, 2=hard, 3=good, 4=easy).",
        session.total_cards()
    );

    while let Some(card) = session.current_card().cloned() {
        let shown_at = Instant::now();
        println!();
        println!(
            "[{}/{}] {}",
            session.cards_studied() + 1,
            session.total_cards(),
            card.front
        );
        prompt("(enter to flip) ")?;
        println!("  {}", card.back);

        let rating = loop {
            let input = prompt("Rating 1-4: ")?;
            let Ok(value) = input.parse::<u32>() else {
                println!("Enter a number from 1 to 4.");
                continue;
            };
            match Rating::from_value(value) {
                Ok(rating) => break rating,
                Err(e) => println!("{e}"),
            }
        };

        let time_spent_secs = shown_at.elapsed().as_secs() as u32;
        let state = session.submit(rating, time_spent_secs)?;
        println!("Next review in {} days.", state.interval);
    }

    let summary = session.finish()?;
    let accuracy =
        (f64::from(summary.correct) / f64::from(summary.cards_studied) * 100.0).round();
    println!();
    println!(
        "Done: {} cards in {}s, {} correct ({accuracy}%).",
        summary.cards_studied, summary.duration_secs, summary.correct
    );

    Ok(())
}

fn select_deck(storage: &Storage) -> Result<Option<i64>> {
    if storage.list_decks()?.is_empty() {
        println!("No decks yet. Create one first.");
        return Ok(None);
    }

    let input = prompt("Deck id (empty to cancel): ")?;
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<i64>() {
        Ok(id) => Ok(Some(id)),
        Err(_) => {
            println!("Not a deck id: {input}");
            Ok(None)
        }
    }
}

fn new_deck(storage: &Storage) -> Result<()> {
    let name = prompt("Deck name: ")?;
    if name.is_empty() {
        return Ok(());
    }
    let description = prompt("Description (optional): ")?;
    let description = (!description.is_empty()).then_some(description);

    let deck = storage.create_deck(&name, description.as_deref())?;
    println!("Created deck '{}' with id {}.", deck.name, deck.id);

    Ok(())
}

fn add_cards(storage: &Storage) -> Result<()> {
    let Some(deck_id) = select_deck(storage)? else {
        return Ok(());
    };

    loop {
        let front = prompt("Front (empty to stop): ")?;
        if front.is_empty() {
            break;
        }
        let back = prompt("Back: ")?;
        let card = storage.create_card(deck_id, &front, &back)?;
        println!("Added card {}.", card.id);
    }

    Ok(())
}

fn delete_deck(storage: &mut Storage) -> Result<()> {
    let Some(deck_id) = select_deck(storage)? else {
        return Ok(());
    };

    let deck = storage.get_deck(deck_id)?;
    let confirm = prompt(&format!("Delete '{}' and all its cards? (y/N) ", deck.name))?;
    if confirm.eq_ignore_ascii_case("y") {
        storage.delete_deck(deck_id)?;
        println!("Deleted.");
    }

    Ok(())
}

fn show_stats(storage: &Storage, config: &Config) -> Result<()> {
    let overview = stats::overview(storage)?;
    println!();
    println!(
        "{} decks, {} cards ({} due now, {} mastered)",
        overview.total_decks, overview.total_cards, overview.due_now, overview.mastered_cards
    );
    println!("Study streak: {} days", overview.study_streak);

    let today = Utc::now().date_naive();
    let window = stats::PERFORMANCE_WINDOW_DAYS;
    let start = today - Days::new(u64::from(window) - 1);
    let reviews = storage.reviews_since(start.and_time(NaiveTime::MIN).and_utc())?;
    println!();
    for day in stats::daily_performance(&reviews, today, window) {
        println!(
            "  {}  {:>3} reviews  {:>3}% correct",
            day.date, day.reviews, day.accuracy
        );
    }

    let sessions = storage.recent_sessions(config.recent_sessions)?;
    if !sessions.is_empty() {
        println!();
        println!("Recent sessions:");
        for session in sessions {
            let deck_name = match session.deck_id {
                Some(id) => storage.get_deck(id)?.name,
                None => "all decks".to_string(),
            };
            println!(
                "  {}  {}  {} cards in {}s ({})",
                session.started_at.format("%Y-%m-%d %H:%M"),
                deck_name,
                session.cards_studied,
                session.duration_secs,
                session.mode
            );
        }
    }

    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        bail!("Input closed");
    }

    Ok(line.trim().to_string())
}
