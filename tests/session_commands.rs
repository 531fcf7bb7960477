use std::sync::Arc;

use montague::error::MontagueError;
use montague::grammar::load_grammar;
use montague::interface::{BUILTIN_GRAMMAR, Reply, Session, Status};
use montague::persist::{PersistenceMode, Persistor};

fn session() -> Session {
    let grammar = load_grammar(BUILTIN_GRAMMAR).expect("demo grammar should load");
    let persistor = Persistor::new(&PersistenceMode::InMemory).expect("in-memory database");
    let mut session = Session::new(Arc::new(grammar), persistor);
    session.execute(".init").expect("tables should be created");
    session
}

fn ask(session: &mut Session, line: &str) -> Reply {
    session
        .execute(line)
        .unwrap_or_else(|e| panic!("'{line}' should be answered: {e}"))
}

/// The result rows as printed, without the `: ` marker.
fn answers(reply: &Reply) -> Vec<String> {
    reply
        .lines
        .iter()
        .filter_map(|line| line.strip_prefix(": "))
        .map(String::from)
        .collect()
}

#[test]
fn statements_are_stored_and_questions_answered() {
    let mut session = session();
    let stored = ask(&mut session, "salad is tasty");
    assert_eq!(stored.status, Status::Okay);
    assert_eq!(
        stored.statements,
        vec!["INSERT INTO my_is(arg0, arg1) VALUES ('Salad', 'Tasty')"]
    );
    assert_eq!(stored.lines.last().map(String::as_str), Some("Okay."));

    assert_eq!(answers(&ask(&mut session, "is salad tasty")), vec!["YES"]);
    assert_eq!(answers(&ask(&mut session, "is salad spicy")), vec!["NO"]);
    assert_eq!(answers(&ask(&mut session, "what is tasty")), vec!["Salad"]);
}

#[test]
fn ingredients() {
    let mut session = session();
    ask(&mut session, "salad consists of tomato");
    ask(&mut session, "salad consists of cheese");
    ask(&mut session, "soup consists of onion");

    let mut ingredients = answers(&ask(&mut session, "what does salad consist of"));
    ingredients.sort();
    assert_eq!(ingredients, vec!["Cheese", "Tomato"]);

    assert_eq!(answers(&ask(&mut session, "how many ingredients does salad have")), vec!["2"]);

    let all = ask(&mut session, "which ingredients are there");
    assert_eq!(all.rows.len(), 3);
}

#[test]
fn numbers_are_stored_as_numbers() {
    let mut session = session();
    ask(&mut session, "soup takes ten minutes");
    assert_eq!(answers(&ask(&mut session, "how long does soup take")), vec!["10"]);
}

#[test]
fn conjoined_statements_insert_twice() {
    let mut session = session();
    let reply = ask(&mut session, "salad consists of tomato and is tasty");
    assert_eq!(reply.statements.len(), 2);
    assert_eq!(answers(&ask(&mut session, "is salad tasty")), vec!["YES"]);
    assert_eq!(answers(&ask(&mut session, "what does salad consist of")), vec!["Tomato"]);
}

#[test]
fn ambiguous_and_unparsable_sentences() {
    let mut session = session();
    let reply = ask(&mut session, "salad is tasty and is spicy and is healthy");
    assert_eq!(reply.status, Status::Ambiguous);
    assert_eq!(reply.lines.len(), 3);
    assert_eq!(reply.lines[0], "(!) Query is ambiguous.");
    assert!(reply.lines[1].starts_with("     [S [STATEMENT"), "{}", reply.lines[1]);
    assert!(reply.statements.is_empty());

    let reply = ask(&mut session, "salad is");
    assert_eq!(reply.status, Status::NoParse);
    assert_eq!(reply.lines, vec!["(!) Unable to parse query."]);

    let value = serde_json::to_value(&reply).expect("reply serializes");
    assert_eq!(value["status"], "no_parse");
}

#[test]
fn the_meaning_of_life() {
    let mut session = session();
    assert_eq!(ask(&mut session, "What is the meaning of life").lines, vec!["42.", "Okay."]);
}

#[test]
fn debug_and_trace_output() {
    let mut session = session();
    assert!(session.debug() && session.trace());
    ask(&mut session, "salad is tasty");

    let reply = ask(&mut session, "is salad tasty");
    assert_eq!(
        reply.lines,
        vec![
            "T= is salad tasty",
            "Q= [S [QUESTION is [NP salad] [ADJ tasty]]]",
            r"S= (\x.Is(Salad,Tasty))",
            r"S= (\x.Is(Salad,Tasty))",
            "< SELECT CASE WHEN count(*)=0 THEN 'NO' ELSE 'YES' END FROM my_is AS alias0_my_is \
             WHERE alias0_my_is.arg0 = 'Salad' AND alias0_my_is.arg1 = 'Tasty'",
            ": YES",
            "Okay.",
        ]
    );

    assert_eq!(ask(&mut session, ".debug").lines, vec!["NLP debugging disabled.", "Okay."]);
    assert_eq!(ask(&mut session, ".trace").lines, vec!["SQL tracing disabled.", "Okay."]);
    assert_eq!(ask(&mut session, "is salad tasty").lines, vec![": YES", "Okay."]);
    assert_eq!(ask(&mut session, ".debug").lines, vec!["NLP debugging enabled.", "Okay."]);
}

#[test]
fn service_commands() {
    let mut session = session();
    let blank = ask(&mut session, "   ");
    assert_eq!(blank.status, Status::Okay);
    assert!(blank.lines.is_empty());

    ask(&mut session, "salad is tasty");
    assert_eq!(ask(&mut session, ".dump").lines, vec![": Is(Salad, Tasty)", "Okay."]);

    ask(&mut session, ".clear");
    assert_eq!(ask(&mut session, ".dump").lines, vec!["Okay."]);

    ask(&mut session, ".fini");
    match session.execute("is salad tasty") {
        Err(MontagueError::Persistence(_)) => {}
        other => panic!("dropped tables should fail the query, got {other:?}"),
    }
    ask(&mut session, ".init");
    assert_eq!(answers(&ask(&mut session, "is salad tasty")), vec!["NO"]);
}

#[test]
fn file_databases_survive_reopening() {
    let path = std::env::temp_dir().join(format!("montague-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let mode = PersistenceMode::from_path(path.to_str());
    assert_eq!(mode, PersistenceMode::File(path.to_string_lossy().into_owned()));

    {
        let grammar = load_grammar(BUILTIN_GRAMMAR).expect("demo grammar should load");
        let persistor = Persistor::new(&mode).expect("file database");
        let mut session = Session::new(Arc::new(grammar), persistor);
        ask(&mut session, ".init");
        ask(&mut session, "pizza is spicy");
    }

    let reopened = Persistor::new(&mode).expect("file database");
    let facts = reopened.dump().expect("dump");
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].relation, "Is");
    assert_eq!(facts[0].arg0.as_deref(), Some("Pizza"));
    drop(reopened);
    let _ = std::fs::remove_file(&path);

    assert_eq!(PersistenceMode::from_path(None), PersistenceMode::InMemory);
}
