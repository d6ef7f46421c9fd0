use std::sync::Arc;
use std::time::Duration;

use markov_core::io::tokenize_text;
use markov_core::{
    ChainBuilder, ChainEdit, GenerationParams, LoggingSink, PlaybackConfig, PlaybackEvent,
    PlaybackSequencer, SequenceGenerator, Speed,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Observations of a rock-paper-scissors player, two games.
    // The empty string separates independent sub-sequences:
    // no transition is recorded from the last move of a game to the first of the next one
    let observations = ["R", "P", "R", "P", "S", "R", "", "S", "S", "P", "R"];
    let mut chain = ChainBuilder::build(&observations);

    // State weights count occurrences, transition weights count consecutive pairs
    for state in chain.states() {
        println!("state {}: {}", state.id(), state.weight());
    }
    for transition in chain.transitions() {
        println!(
            "{} -> {}: {} (p = {:.2})",
            transition.from(),
            transition.to(),
            transition.weight(),
            chain.transition_probability(transition.from(), transition.to()).unwrap_or_default()
        );
    }

    // Drawing mode: chains can also be edited by hand
    chain.apply(&ChainEdit::AddState { id: "L".to_owned(), label: Some("Lizard".to_owned()), weight: 1.0 })?;
    chain.apply(&ChainEdit::SetTransition { from: "S".to_owned(), to: "L".to_owned(), weight: 0.5 })?;
    chain.apply(&ChainEdit::MoveState { id: "L".to_owned(), position: Some((40.0, 25.0)) })?;
    chain.apply(&ChainEdit::SetTransitionLabel { from: "S".to_owned(), to: "L".to_owned(), label: Some("escape".to_owned()) })?;

    // Invalid edits are rejected
    match chain.apply(&ChainEdit::SetTransition { from: "L".to_owned(), to: "Spock".to_owned(), weight: 1.0 }) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Rejected edit: {e}"),
    }

    // Walks start from a random state (drawn by occurrence) or from a fixed one,
    // and stop early at states without outgoing transitions ('L' here)
    let mut generator = SequenceGenerator::seeded(7);
    let random_start = GenerationParams::new(None, 8, " ")?;
    let from_rock = GenerationParams::new(Some("R".to_owned()), 8, " ")?;
    for i in 0..5 {
        println!("walk {}: {}", i + 1, generator.generate(&chain, &random_start).join(" "));
    }
    println!("from rock: {}", generator.generate(&chain, &from_rock).join(" "));

    // Unknown starting states produce nothing
    let unknown = GenerationParams::new(Some("Spock".to_owned()), 8, " ")?;
    println!("from spock: {} states", generator.generate(&chain, &unknown).len());

    // Prose can be turned into word observations too
    let text = "the cat saw the dog\nthe dog saw the cat\n\nthe end";
    let words = ChainBuilder::build(&tokenize_text(text));
    println!("text chain: {} states, {} transitions", words.state_count(), words.transition_count());

    // Timed playback: each hop is shown in two sub-steps (arrived, committed)
    let config = PlaybackConfig { fast_interval_ms: 50, speed: Speed::Fast, seed: Some(7), ..PlaybackConfig::default() };
    let mut sequencer = PlaybackSequencer::new(config, Arc::new(LoggingSink));
    sequencer.set_chain(Arc::new(chain));
    let mut events = sequencer.subscribe();

    sequencer.set_params(GenerationParams::new(Some("R".to_owned()), 4, " -> ")?);
    sequencer.play();
    sequencer.run_until_ready().await;

    // Same parameters: the sequence joins the same group
    sequencer.play();
    sequencer.run_until_ready().await;

    // Manual stepping with new parameters opens a new group
    sequencer.set_params(GenerationParams::new(None, 3, ", ")?);
    sequencer.step();
    while sequencer.state() != markov_core::PlaybackState::Ready {
        println!("so far: {}", sequencer.partial_text());
        sequencer.step();
    }

    // Canceled runs never reach the output
    sequencer.play();
    sequencer.cancel();

    while let Ok(event) = events.try_recv() {
        if let PlaybackEvent::Committed { from, to, .. } = event {
            println!("took {from} -> {to}");
        }
    }

    print!("{}", sequencer.history().to_text());

    // Let the export tasks run before exiting
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}
