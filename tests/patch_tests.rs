use invoice_patcher::invoice::period::{self, PeriodOutcome};
use invoice_patcher::{Document, Engine, PatchError, PatcherConfig, Strategy};
use std::fs;
use tempfile::tempdir;

const GAP: &str = "\n                  ";

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/data/{}", name))
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", name, e))
}

fn keep_prolog() -> Engine {
    Engine::new(PatcherConfig {
        strip_prolog: false,
        ..PatcherConfig::default()
    })
}

#[test]
fn test_provider_code_slot_replaced_verbatim() {
    let nested = format!(
        "<Invoice><AdditionalInformation><Name>CODIGO_PRESTADOR</Name>{}<Value>Array</Value></AdditionalInformation></Invoice>",
        GAP
    );
    let outer = format!(
        "<Doc><Description>first</Description><Description><![CDATA[{}]]></Description></Doc>",
        nested
    );

    let (patched, stats) = Engine::default().patch_text(&outer).unwrap();
    assert_eq!(stats.nested_documents, 1);
    assert_eq!(
        patched,
        outer.replace("<Value>Array</Value>", "<Value>0800185010</Value>")
    );
}

#[test]
fn test_contract_number_follows_regime_marker() {
    let cases = [
        ("Subsidiado", Some("10787")),
        ("Contributivo", Some("3672")),
        ("Especial", None),
    ];
    for (marker, expected) in cases {
        let original = format!(
            "<Doc><D/><D><![CDATA[<Invoice><Note>{}</Note><Info><Name>NUMERO_CONTRATO</Name><Value>Array</Value></Info></Invoice>]]></D></Doc>",
            marker
        );
        let engine = Engine::new(PatcherConfig {
            carrier_tag: "D".to_string(),
            ..PatcherConfig::default()
        });
        let (patched, _) = engine.patch_text(&original).unwrap();
        match expected {
            Some(number) => assert_eq!(
                patched,
                original.replace("<Value>Array</Value>", &format!("<Value>{}</Value>", number))
            ),
            None => assert_eq!(patched, original),
        }
    }
}

#[test]
fn test_changes_confined_to_patched_regions() {
    let original = fixture("subsidiado.xml");
    let (patched, _) = keep_prolog().patch_text(&original).unwrap();

    let anchor = "<cbc:LineCountNumeric>1</cbc:LineCountNumeric>";
    let expected = original
        .replace(
            &format!("<Name>CODIGO_PRESTADOR</Name>{}<Value>Array</Value>", GAP),
            &format!("<Name>CODIGO_PRESTADOR</Name>{}<Value>0800185010</Value>", GAP),
        )
        .replace(
            r#"<Value schemeID="Array" schemeName="salud_modalidad_pago.gc"></Value>"#,
            r#"<Value schemeID="04" schemeName="salud_modalidad_pago.gc">Pago por evento</Value>"#,
        )
        .replace(
            r#"<Value schemeID="Array" schemeName="salud_cobertura.gc"></Value>"#,
            r#"<Value schemeID="02" schemeName="salud_cobertura.gc">Presupuesto máximo</Value>"#,
        )
        .replace(
            &format!("<Name>NUMERO_CONTRATO</Name>{}<Value>Array</Value>", GAP),
            &format!("<Name>NUMERO_CONTRATO</Name>{}<Value>10787</Value>", GAP),
        )
        .replace(
            &format!("<Name>NUMERO_POLIZA</Name>{}<Value>Array</Value>", GAP),
            &format!("<Name>NUMERO_POLIZA</Name>{}<Value>NA</Value>", GAP),
        )
        .replace(
            anchor,
            &format!(
                "{}\n<cac:InvoicePeriod>\n <cbc:StartDate>2025-07-29</cbc:StartDate>\n <cbc:StartTime>12:00:00</cbc:StartTime>\n <cbc:EndDate>2025-07-29</cbc:EndDate>\n <cbc:EndTime>11:59:59</cbc:EndTime>\n</cac:InvoicePeriod>",
                anchor
            ),
        );

    assert_eq!(patched, expected);
}

#[test]
fn test_period_synthesized_after_anchor() {
    let mut text = String::from(
        "<Invoice><cbc:LineCountNumeric xmlns:cbc=\"urn:cbc\">3</cbc:LineCountNumeric><Items/><Note>FecFac: 2025-07-29</Note></Invoice>",
    );
    let outcome = period::synthesize(&mut text, Strategy::Structural.locator()).unwrap();
    assert_eq!(outcome, PeriodOutcome::Added);
    assert!(text.contains(
        "3</cbc:LineCountNumeric>\n<cac:InvoicePeriod>\n <cbc:StartDate>2025-07-29</cbc:StartDate>\n <cbc:StartTime>12:00:00</cbc:StartTime>\n <cbc:EndDate>2025-07-29</cbc:EndDate>\n <cbc:EndTime>11:59:59</cbc:EndTime>\n</cac:InvoicePeriod><Items/>"
    ));
}

#[test]
fn test_existing_period_reports_not_added() {
    let original = fixture("contributivo_with_period.xml");
    let (patched, stats) = Engine::default().patch_text(&original).unwrap();
    assert!(!stats.period_added);
    assert_eq!(patched.matches("<cac:InvoicePeriod>").count(), 1);
    assert_eq!(patched.matches("</cac:InvoicePeriod>").count(), 1);
}

#[test]
fn test_process_writes_derived_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("FEV1538339.xml");
    fs::write(&input, fixture("subsidiado.xml")).unwrap();

    let (written, stats) = Engine::default().process(&input, None).unwrap();
    assert_eq!(written, dir.path().join("FEV1538339-modificado.xml"));
    assert!(stats.period_added);
    assert_eq!(stats.fired.len(), 5);

    let content = fs::read_to_string(&written).unwrap();
    assert!(content.contains("<Value>0800185010</Value>"));
    // Source file is untouched.
    assert_eq!(fs::read_to_string(&input).unwrap(), fixture("subsidiado.xml"));
}

#[test]
fn test_process_explicit_output_and_second_pass_is_noop() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.xml");
    let output = dir.path().join("out.xml");
    fs::write(&input, fixture("ambiguous.xml")).unwrap();

    let engine = Engine::default();
    let (written, _) = engine.process(&input, Some(&output)).unwrap();
    assert_eq!(written, output);
    let first = fs::read_to_string(&output).unwrap();

    let again = dir.path().join("again.xml");
    let (_, stats) = engine.process(&output, Some(&again)).unwrap();
    assert!(!stats.changed());
    assert_eq!(fs::read_to_string(&again).unwrap(), first);
}

#[test]
fn test_missing_input_is_read_error() {
    let dir = tempdir().unwrap();
    let err = Engine::default()
        .process(&dir.path().join("missing.xml"), None)
        .unwrap_err();
    assert!(matches!(err, PatchError::Read { .. }));
}

#[test]
fn test_document_unchanged_when_nothing_applies() {
    let text = "<Doc><Description>a</Description><Description>plain text</Description></Doc>";
    let mut document = Document::from_text("unused.xml", text);
    let stats = Engine::default().patch_document(&mut document).unwrap();
    assert_eq!(stats.nested_documents, 0);
    assert_eq!(document.content().unwrap(), text);
}

#[test]
fn test_repeated_collections_patched_in_one_pass() {
    let original = fixture("two_collections.xml");
    let mut outputs = Vec::new();

    for strategy in [Strategy::Structural, Strategy::Literal] {
        let engine = Engine::new(PatcherConfig {
            strategy,
            strip_prolog: false,
            ..PatcherConfig::default()
        });
        let (once, stats) = engine.patch_text(&original).unwrap();
        assert_eq!(stats.fired.len(), 5, "{} strategy", strategy);
        assert!(!once.contains("Array"), "{} strategy left a placeholder", strategy);
        assert_eq!(once.matches("<Value>NA</Value>").count(), 2);
        assert_eq!(once.matches("<Value>0800185010</Value>").count(), 2);

        let (twice, stats) = engine.patch_text(&once).unwrap();
        assert!(stats.fired.is_empty());
        assert!(!stats.period_added);
        assert_eq!(twice, once);
        outputs.push(once);
    }

    assert_eq!(outputs[0], outputs[1]);
}
