use aiseg2_bridge::extract::{parse_status, Category, Unit};
use pretty_assertions::assert_eq;

fn status_doc(use_kwh: &str, buy: &str, sell: &str, gen: &str, circuit_rows: &str) -> String {
    format!(
        r#"<html><body>
<div id="energyflow">
  <span id="val_use_kwh">{use_kwh}</span>
  <span id="val_buy_kwh">{buy}</span>
  <span id="val_sell_kwh">{sell}</span>
  <span id="val_gen_kwh">{gen}</span>
</div>
<table id="circuit_list">
{circuit_rows}
</table>
</body></html>"#
    )
}

fn circuit_row(index: &str, value: &str) -> String {
    format!(
        r#"<tr class="circuit_row"><td class="circuit_no">{index}</td><td class="circuit_kwh">{value}</td></tr>"#
    )
}

#[test]
fn totals_and_one_circuit() {
    let doc = status_doc("12.5kWh", "10.0", "0.0", "2.5", &circuit_row("3", "1.2"));
    let readings = parse_status(&doc).unwrap();

    assert_eq!(readings.len(), 5);
    let identities: Vec<&str> = readings.iter().map(|r| r.identity.as_str()).collect();
    assert_eq!(
        identities,
        vec!["total_use_kwh", "buy_kwh", "sell_kwh", "gen_kwh", "c3_kwh"]
    );
    assert_eq!(readings[0].value, 12.5);
    assert_eq!(readings[3].value, 2.5);
    assert_eq!(readings[4].value, 1.2);
    assert_eq!(readings[4].category, Category::Circuit);
    assert_eq!(readings[4].circuit_index, Some(3));
    assert!(readings.iter().all(|r| r.unit == Unit::KilowattHours));
}

#[test]
fn reading_count_is_four_plus_circuits() {
    for n in [0u16, 1, 7] {
        let rows: String = (1..=n).map(|i| circuit_row(&i.to_string(), "0.5")).collect();
        let readings = parse_status(&status_doc("1", "1", "1", "1", &rows)).unwrap();
        assert_eq!(readings.len(), 4 + n as usize);
    }
}

#[test]
fn circuits_sorted_ascending_with_duplicates_dropped() {
    let rows = [
        circuit_row("12", "0.3"),
        circuit_row("2", "0.1"),
        circuit_row("2", "9.9"),
        circuit_row("5", "0.2"),
    ]
    .concat();
    let readings = parse_status(&status_doc("1", "1", "1", "1", &rows)).unwrap();
    let circuits: Vec<(Option<u16>, f64)> = readings[4..]
        .iter()
        .map(|r| (r.circuit_index, r.value))
        .collect();
    // first occurrence of a duplicated index wins
    assert_eq!(
        circuits,
        vec![(Some(2), 0.1), (Some(5), 0.2), (Some(12), 0.3)]
    );
}

#[test]
fn missing_total_anchor_fails() {
    let doc = status_doc("12.5", "10.0", "0.0", "2.5", "").replace("val_sell_kwh", "val_other");
    let err = parse_status(&doc).unwrap_err();
    assert!(err.to_string().contains("val_sell_kwh"), "got: {err}");
}

#[test]
fn missing_circuit_table_fails() {
    let doc = status_doc("1", "1", "1", "1", "").replace("circuit_list", "something_else");
    let err = parse_status(&doc).unwrap_err();
    assert!(err.to_string().contains("circuit_list"), "got: {err}");
}

#[test]
fn login_page_fails_parse() {
    let doc = "<html><body><form id=\"login\"><input name=\"user\"></form></body></html>";
    assert!(parse_status(doc).is_err());
}

#[test]
fn blank_circuit_rows_are_skipped_not_errors() {
    let rows = [
        circuit_row("1", "0.4"),
        circuit_row("2", ""),
        circuit_row("3", "-"),
        circuit_row("4", "2.0"),
    ]
    .concat();
    let readings = parse_status(&status_doc("1", "1", "1", "1", &rows)).unwrap();
    let identities: Vec<&str> = readings[4..].iter().map(|r| r.identity.as_str()).collect();
    assert_eq!(identities, vec!["c1_kwh", "c4_kwh"]);
}

#[test]
fn non_numeric_cells_fail_instead_of_defaulting_to_zero() {
    let doc = status_doc("oops", "1", "1", "1", "");
    assert!(parse_status(&doc).is_err());

    let doc = status_doc("1", "1", "1", "1", &circuit_row("2", "n/a"));
    let err = parse_status(&doc).unwrap_err();
    assert!(err.to_string().contains("circuit 2"), "got: {err}");
}

#[test]
fn separators_and_unit_suffixes() {
    let doc = status_doc("1,234.5kWh", "1，234．5", "500Wh", "0", "");
    let readings = parse_status(&doc).unwrap();
    assert_eq!(readings[0].value, 1234.5);
    assert_eq!(readings[1].value, 1234.5);
    assert_eq!(readings[2].value, 0.5);
    assert_eq!(readings[3].value, 0.0);
}
