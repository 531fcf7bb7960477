use montague::error::MontagueError;
use montague::literal::parse_logical_form;
use montague::persist::table_for;
use montague::sql::translate;

fn sql(source: &str) -> Vec<String> {
    let form = parse_logical_form(source).unwrap_or_else(|e| panic!("'{source}' should parse: {e}"));
    translate(&form).unwrap_or_else(|e| panic!("'{source}' should translate: {e}"))
}

fn rejection(source: &str) -> String {
    let form = parse_logical_form(source).unwrap_or_else(|e| panic!("'{source}' should parse: {e}"));
    match translate(&form) {
        Err(MontagueError::Translation(message)) => message,
        other => panic!("'{source}' should not translate, got {other:?}"),
    }
}

#[test]
fn facts_become_inserts() {
    assert_eq!(
        sql("Is(Salad,Tasty)"),
        vec!["INSERT INTO my_is(arg0, arg1) VALUES ('Salad', 'Tasty')"]
    );
    assert_eq!(
        sql("Takes(Soup,Ten)"),
        vec!["INSERT INTO my_takes(arg0, arg1) VALUES ('Soup', 10)"]
    );
}

#[test]
fn conjunctions_insert_into_each_relation() {
    assert_eq!(
        sql("Consists(Salad,Tomato) && Is(Salad,Tasty)"),
        vec![
            "INSERT INTO my_consists(arg0, arg1) VALUES ('Salad', 'Tomato')",
            "INSERT INTO my_is(arg0, arg1) VALUES ('Salad', 'Tasty')",
        ]
    );
    let message = rejection("Is(Salad,Tasty) && Is(Salad,Healthy)");
    assert!(message.contains("too complex"), "{message}");
}

#[test]
fn lambdas_become_selects() {
    assert_eq!(
        sql(r"\x.Is(x,Tasty)"),
        vec![
            "SELECT alias0_my_is.arg0 AS x FROM my_is AS alias0_my_is \
             WHERE alias0_my_is.arg1 = 'Tasty'"
        ]
    );
    assert_eq!(
        sql(r"\x.\y.Consists(x,y)"),
        vec![
            "SELECT alias0_my_consists.arg0 AS x, alias0_my_consists.arg1 AS y \
             FROM my_consists AS alias0_my_consists"
        ]
    );
}

#[test]
fn shared_variables_join_relations() {
    assert_eq!(
        sql(r"\x.Consists(x,Tomato) && Is(x,Tasty)"),
        vec![
            "SELECT alias0_my_consists.arg0 AS x \
             FROM my_consists AS alias0_my_consists, my_is AS alias1_my_is \
             WHERE alias0_my_consists.arg1 = 'Tomato' AND alias1_my_is.arg1 = 'Tasty' \
             AND alias0_my_consists.arg0 = alias1_my_is.arg0"
        ]
    );
}

#[test]
fn closed_questions_check_existence() {
    assert_eq!(
        sql(r"\x.Is(Salad,Tasty)"),
        vec![
            "SELECT CASE WHEN count(*)=0 THEN 'NO' ELSE 'YES' END \
             FROM my_is AS alias0_my_is \
             WHERE alias0_my_is.arg0 = 'Salad' AND alias0_my_is.arg1 = 'Tasty'"
        ]
    );
}

#[test]
fn aggregates() {
    assert_eq!(
        sql(r"Distinctselect(\x.\y.Consists(x,y))"),
        vec!["SELECT DISTINCT arg1 FROM my_consists"]
    );
    assert_eq!(
        sql(r"Count(\x.\y.Consists(x,y))"),
        vec!["SELECT COUNT(DISTINCT arg0) FROM my_consists"]
    );
    assert_eq!(
        sql(r"Count(\x.Consists(Salad,x))"),
        vec![
            "SELECT COUNT(alias0_my_consists.arg1) AS x FROM my_consists AS alias0_my_consists \
             WHERE alias0_my_consists.arg0 = 'Salad'"
        ]
    );
    assert_eq!(
        sql(r"Sum(\x.Takes(Soup,x))"),
        vec![
            "SELECT SUM(alias0_my_takes.arg1) AS x FROM my_takes AS alias0_my_takes \
             WHERE alias0_my_takes.arg0 = 'Soup'"
        ]
    );
}

#[test]
fn unsupported_forms_are_rejected() {
    assert!(rejection("!Is(Salad,Tasty)").contains("'Not'"));
    assert!(rejection("Is(Salad,Tasty) || Is(Soup,Spicy)").contains("'Or'"));
    assert!(rejection("Likes(John,Mary)").contains("Unknown relation 'Likes'"));
    assert!(rejection("Salad").contains("too complex"));
    assert!(rejection(r"\x.Is(x,Pizza(Cheese))").contains("Unsupported argument"));
}

#[test]
fn quotes_in_constants_are_escaped() {
    let form = montague::logic::LogicalForm::apply(
        montague::logic::LogicalForm::apply(
            montague::logic::LogicalForm::symbol("Is"),
            montague::logic::LogicalForm::symbol("O'Brien"),
        ),
        montague::logic::LogicalForm::symbol("Tasty"),
    );
    assert_eq!(
        translate(&form).expect("insert"),
        vec!["INSERT INTO my_is(arg0, arg1) VALUES ('O''Brien', 'Tasty')"]
    );
    assert_eq!(table_for("Have").expect("known relation"), "my_have");
}
