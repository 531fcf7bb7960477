use std::collections::BTreeSet;
use std::thread;

use montague::earley::{Chart, parse};
use montague::error::MontagueError;
use montague::grammar::{Grammar, GrammarBuilder, Production, RuleId, Term, load_grammar, tokenize};
use montague::literal::parse_logical_form;
use montague::logic::LogicalForm;

const LIKES: &str = r"
S:V(n) -> NP:n VP:V
VP:\y.Likes(y,o) -> likes NP:o
NP:John -> john
NP:Mary -> mary
";

const ATTACHMENT: &str = r"
S:V(n) -> NP:n VP:V
VP:\y.Sees(y,o) -> sees NP:o
VP:\y.V(y)&&Using(y,m) -> VP:V with NP:m
NP:With(n,m) -> NP:n with NP:m
NP:John -> john
NP:Mary -> mary
NP:Telescope -> telescope
";

fn grammar(source: &str) -> Grammar {
    load_grammar(source).unwrap_or_else(|e| panic!("grammar should load: {e}"))
}

fn lf(source: &str) -> LogicalForm {
    parse_logical_form(source).unwrap_or_else(|e| panic!("'{source}' should parse: {e}"))
}

fn readings(grammar: &Grammar, sentence: &str) -> BTreeSet<String> {
    grammar
        .parse("S", sentence)
        .expect("start rule exists")
        .iter()
        .map(|parse| parse.semantics.beta_reduce().to_string())
        .collect()
}

fn catalan(n: usize) -> usize {
    let mut counts = vec![0usize; n + 1];
    counts[0] = 1;
    for i in 1..=n {
        counts[i] = (0..i).map(|k| counts[k] * counts[i - 1 - k]).sum();
    }
    counts[n]
}

#[test]
fn unambiguous_sentence_has_one_reading() {
    let grammar = grammar(LIKES);
    let parses = grammar.parse("S", "john likes mary").expect("start rule exists");
    assert_eq!(parses.len(), 1);
    assert_eq!(parses[0].semantics.beta_reduce().to_string(), "Likes(John,Mary)");
    assert_eq!(parses[0].tree.bracketed(), "[S [NP john] [VP likes [NP mary]]]");
    assert_eq!(parses[0].tree.name(), "S");
    assert_eq!(parses[0].tree.children().len(), 2);
}

#[test]
fn attachment_ambiguity_yields_both_readings() {
    let grammar = grammar(ATTACHMENT);
    let expected: BTreeSet<String> = [
        "Sees(John,Mary) && Using(John,Telescope)",
        "Sees(John,With(Mary,Telescope))",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(readings(&grammar, "john sees mary with telescope"), expected);

    let trees: BTreeSet<String> = grammar
        .parse("S", "john sees mary with telescope")
        .expect("start rule exists")
        .iter()
        .map(|parse| parse.tree.bracketed())
        .collect();
    assert!(trees.contains("[S [NP john] [VP [VP sees [NP mary]] with [NP telescope]]]"));
    assert!(trees.contains("[S [NP john] [VP sees [NP [NP mary] with [NP telescope]]]]"));
}

#[test]
fn builder_grammars_parse_operator_chains() {
    let grammar = GrammarBuilder::new()
        .production("E", "Plus(l,r)", "E:l + E:r")
        .and_then(|b| b.production("E", "One", "1"))
        .and_then(|b| b.production("E", "Two", "2"))
        .and_then(|b| b.production("E", "Three", "3"))
        .and_then(|b| b.build("E"))
        .expect("grammar should build");
    let semantics: BTreeSet<String> = grammar
        .parse("E", "1 + 2 + 3")
        .expect("start rule exists")
        .iter()
        .map(|parse| parse.semantics.to_string())
        .collect();
    let expected: BTreeSet<String> = ["Plus(Plus(One,Two),Three)", "Plus(One,Plus(Two,Three))"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(semantics, expected);
}

#[test]
fn every_bracketing_is_produced_exactly_once() {
    let grammar = grammar("S -> S S\nS -> a");
    for n in 1..=7 {
        let tokens = vec!["a".to_string(); n];
        let parses = parse(&grammar, "S", &tokens).expect("start rule exists");
        assert_eq!(parses.len(), catalan(n - 1), "derivations of {n} tokens");
        let distinct: BTreeSet<String> = parses.iter().map(|p| p.tree.bracketed()).collect();
        assert_eq!(distinct.len(), parses.len(), "no derivation repeats for {n} tokens");
        for parse in &parses {
            assert_eq!(parse.tree.leaves(), vec!["a"; n]);
        }
    }
}

#[test]
fn derivations_are_produced_on_demand() {
    let grammar = grammar("S -> S S\nS -> a");
    let tokens = vec!["a".to_string(); 12];
    let chart = Chart::build(&grammar, "S", &tokens).expect("start rule exists");
    assert!(chart.is_complete());
    let first: Vec<_> = chart.derivations().take(3).collect();
    assert_eq!(first.len(), 3);
    assert_ne!(first[0].tree, first[1].tree);
}

#[test]
fn parsing_is_deterministic() {
    let grammar = grammar(ATTACHMENT);
    let first = grammar.parse("S", "john sees mary with telescope").expect("start rule exists");
    let second = grammar.parse("S", "john sees mary with telescope").expect("start rule exists");
    assert_eq!(first, second);
}

#[test]
fn derivations_cover_the_input() {
    let grammar = grammar(ATTACHMENT);
    let sentence = "john sees mary with telescope with telescope";
    let tokens = tokenize(sentence);
    let parses = grammar.parse("S", sentence).expect("start rule exists");
    assert!(parses.len() > 2);
    for parse in &parses {
        assert_eq!(parse.tree.name(), "S");
        assert_eq!(parse.tree.span(), (0, tokens.len()));
        assert_eq!(parse.tree.leaves(), tokens.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(parse.tree.semantics(), &parse.semantics);
    }
}

#[test]
fn tokens_are_matched_case_insensitively() {
    let grammar = grammar(LIKES);
    assert_eq!(readings(&grammar, "JOHN Likes mary").len(), 1);
}

#[test]
fn empty_productions_take_part_in_derivations() {
    let grammar = grammar("S -> A B\nA ->\nB -> A b");
    let parses = grammar.parse("S", "b").expect("start rule exists");
    assert_eq!(parses.len(), 1);
    assert_eq!(parses[0].tree.bracketed(), "[S [A] [B [A] b]]");
    assert_eq!(parses[0].tree.children()[0].span(), (0, 0));
}

#[test]
fn rejected_sentences_have_no_derivations() {
    let grammar = grammar(LIKES);
    assert!(grammar.parse("S", "mary john").expect("start rule exists").is_empty());
    assert!(grammar.parse("S", "john likes").expect("start rule exists").is_empty());
    assert!(grammar.parse("S", "john likes bob").expect("start rule exists").is_empty());
    assert!(!grammar.chart("S", "mary john").expect("start rule exists").is_complete());

    match grammar.parse("T", "john likes mary") {
        Err(MontagueError::UndefinedStartRule(name)) => assert_eq!(name, "T"),
        other => panic!("unknown start rule should be reported, got {other:?}"),
    }
}

#[test]
fn chart_columns_follow_the_tokens() {
    let grammar = grammar(LIKES);
    let chart = grammar.chart("S", "john likes mary").expect("start rule exists");
    let columns = chart.columns();
    assert_eq!(columns.len(), 4);
    assert_eq!(columns[0].token(), None);
    assert_eq!(columns[1].token(), Some("john"));
    assert_eq!(columns[3].token(), Some("mary"));
    assert!(columns.iter().all(|column| !column.is_empty()));
    assert_eq!(chart.item_count(), columns.iter().map(|c| c.len()).sum::<usize>());
    assert_eq!(chart.grammar().rule_name(chart.start()), Some("S"));
    assert!(chart.is_complete());
}

#[test]
fn grammars_are_shared_between_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Grammar>();

    let grammar = grammar(ATTACHMENT);
    thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| readings(&grammar, "john sees mary with telescope").len()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("parser thread"), 2);
        }
    });
}

#[test]
fn composition_respects_the_binding_mode() {
    let slot = vec![(Term::NonTerminal(RuleId(0)), Some("x".to_string()))];
    let y = lf("y");
    let safe = Production::new(lf(r"\y.Likes(y,x)"), slot.clone(), true);
    assert_eq!(safe.compose([&y]).to_string(), r"(\y'.Likes(y',y))");
    let unsafe_ = Production::new(lf(r"\y.Likes(y,x)"), slot, false);
    assert_eq!(unsafe_.compose([&y]).to_string(), r"(\y.Likes(y,y))");
}
