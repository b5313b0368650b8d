use informe::codes::CodeStatus;
use informe::report::aggregate::{
    code_alerts, consolidate, filter_by_periods, filter_subjects, format_cpf,
    format_decimal_comma, format_money, group_by_period, periods_of, summarize, IncomeClasses,
};
use informe::types::{
    Dependent, IncomeInfo, MonthlyTotals, PaymentEvent, SourceKind, SubjectRecord,
};
use rust_decimal::Decimal;

fn income(code: &str, cents: i64, status: CodeStatus) -> IncomeInfo {
    IncomeInfo {
        code: code.to_string(),
        description: format!("Código {code}"),
        status,
        amount: Decimal::new(cents, 2),
        note: String::new(),
    }
}

fn payment(period: &str, date: &str, income: Vec<IncomeInfo>) -> PaymentEvent {
    PaymentEvent {
        period: period.to_string(),
        payment_date: date.to_string(),
        payment_type: "1".to_string(),
        reference_id: String::new(),
        category_code: "101".to_string(),
        category_description: String::new(),
        income,
        totals: Some(MonthlyTotals::default()),
        dependents: Vec::new(),
        deductions: Vec::new(),
        competence: None,
        source_file: format!("{period}.xml"),
    }
}

fn record(subject: &str, per_apur: &str, payments: Vec<PaymentEvent>) -> SubjectRecord {
    SubjectRecord {
        source: SourceKind::S5002,
        file_name: format!("{per_apur}.xml"),
        receipt_number: format!("REC-{per_apur}"),
        apportionment_period: per_apur.to_string(),
        employer_kind: "1".to_string(),
        employer_id: "12345678".to_string(),
        subject_id: subject.to_string(),
        payments,
        dependents: Vec::new(),
        deductions: Vec::new(),
    }
}

fn dependent(period: &str) -> Dependent {
    Dependent {
        cpf: "98765432100".to_string(),
        irrf_dependent: "S".to_string(),
        birth_date: String::new(),
        name: "MARIA".to_string(),
        kind_code: "03".to_string(),
        kind_description: String::new(),
        period: period.to_string(),
    }
}

#[test]
fn consolidation_keeps_first_identification_and_ignores_other_subjects() {
    let mut blank = record("1", "", vec![payment("2024-03", "2024-03-30", Vec::new())]);
    blank.employer_id = String::new();
    let records = vec![
        blank,
        record("1", "2024-02", vec![payment("2024-02", "2024-02-28", Vec::new())]),
        record("2", "2024-01", vec![payment("2024-01", "2024-01-31", Vec::new())]),
        record("1", "2024-01", vec![payment("2024-01", "2024-01-31", Vec::new())]),
    ];

    let consolidated = consolidate(SourceKind::S5002, "1", records);
    assert_eq!(consolidated.apportionment_period, "2024-02");
    assert_eq!(consolidated.receipt_number, "REC-");
    assert_eq!(consolidated.employer_id, "12345678");
    assert_eq!(consolidated.payments.len(), 3);
}

#[test]
fn payments_group_by_period_in_date_order() {
    let consolidated = consolidate(
        SourceKind::S5002,
        "1",
        vec![
            record("1", "2024-02", vec![
                payment("2024-02", "2024-02-28", Vec::new()),
                payment("2024-02", "2024-02-05", Vec::new()),
                payment("", "2024-02-01", Vec::new()),
            ]),
            record("1", "2024-01", vec![payment("2024-01", "2024-01-31", Vec::new())]),
        ],
    );

    assert_eq!(periods_of(&consolidated), vec!["2024-01", "2024-02"]);

    let groups = group_by_period(&consolidated);
    assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["2024-01", "2024-02"]);
    let dates: Vec<&str> = groups["2024-02"].iter().map(|p| p.payment_date.as_str()).collect();
    assert_eq!(dates, vec!["2024-02-05", "2024-02-28"]);
}

#[test]
fn period_filter_rebuilds_dependents() {
    let mut january = payment("2024-01", "2024-01-31", Vec::new());
    january.dependents.push(dependent("2024-01"));
    let mut february = payment("2024-02", "2024-02-28", Vec::new());
    february.dependents.push(dependent("2024-02"));

    let mut source = record("1", "2024-01", vec![january, february]);
    source.consolidate_dependents();
    let consolidated = consolidate(SourceKind::S5002, "1", vec![source]);
    assert_eq!(consolidated.dependents.len(), 2);

    let filtered = filter_by_periods(&consolidated, &["2024-02".to_string()]);
    assert_eq!(filtered.payments.len(), 1);
    assert_eq!(filtered.dependents.len(), 1);
    assert_eq!(filtered.dependents[0].period, "2024-02");

    assert_eq!(filter_by_periods(&consolidated, &[]), consolidated);
    assert!(filter_by_periods(&consolidated, &["2023-12".to_string()]).payments.is_empty());
}

#[test]
fn summaries_classify_income_codes() {
    let consolidated = consolidate(
        SourceKind::S5002,
        "1",
        vec![record("1", "2024-01", vec![
            payment("2024-01", "2024-01-31", vec![
                income("11", 100000, CodeStatus::Exact),
                income("41", 11000, CodeStatus::Exact),
                income("79", 5000, CodeStatus::Exact),
                income("72", 2000, CodeStatus::Exact),
            ]),
            payment("2024-01", "2024-01-15", vec![income("13", 50000, CodeStatus::Exact)]),
        ])],
    );

    let summaries = summarize(&consolidated, &IncomeClasses::default());
    assert_eq!(summaries.len(), 1);
    let january = &summaries[0];
    assert_eq!(january.payment_count, 2);
    assert_eq!(january.taxable, Decimal::new(150000, 2));
    assert_eq!(january.withheld, Decimal::new(11000, 2));
    assert_eq!(january.exempt, Decimal::new(2000, 2));
    assert_eq!(january.gross, Decimal::new(168000, 2));
    assert_eq!(january.net, Decimal::new(157000, 2));

    let custom = IncomeClasses {
        taxable: vec!["11".to_string()],
        withheld: Vec::new(),
        exempt: vec!["79".to_string()],
    };
    let summaries = summarize(&consolidated, &custom);
    assert_eq!(summaries[0].taxable, Decimal::new(100000, 2));
    assert_eq!(summaries[0].exempt, Decimal::new(5000, 2));
}

#[test]
fn alerts_cover_corrected_and_uncataloged_codes() {
    let consolidated = consolidate(
        SourceKind::S5002,
        "1",
        vec![record("1", "2024-01", vec![payment("2024-01", "2024-01-31", vec![
            income("11", 100, CodeStatus::Exact),
            income("011", 200, CodeStatus::Corrected),
            income("03", 300, CodeStatus::ZeroStripped),
            income("999", 400, CodeStatus::Uncataloged),
        ])])],
    );

    let alerts = code_alerts(&consolidated);
    let codes: Vec<&str> = alerts.iter().map(|a| a.code.as_str()).collect();
    assert_eq!(codes, vec!["011", "999"]);
    assert_eq!(alerts[1].amount, Decimal::new(400, 2));
    assert_eq!(alerts[1].period, "2024-01");
}

#[test]
fn subject_search_ignores_cpf_punctuation() {
    let subjects = vec!["12345678901".to_string(), "98765432100".to_string()];
    assert_eq!(filter_subjects(&subjects, "456.789"), vec!["12345678901".to_string()]);
    assert_eq!(filter_subjects(&subjects, "432100"), vec!["98765432100".to_string()]);
    assert_eq!(filter_subjects(&subjects, "  "), subjects);
    assert!(filter_subjects(&subjects, "000").is_empty());
}

#[test]
fn formats_cpf_and_money() {
    assert_eq!(format_cpf("12345678901"), "123.456.789-01");
    assert_eq!(format_cpf("1234"), "1234");

    assert_eq!(format_money(Decimal::new(123456, 2)), "1.234,56");
    assert_eq!(format_money(Decimal::new(123456789, 2)), "1.234.567,89");
    assert_eq!(format_money(Decimal::new(5, 1)), "0,50");
    assert_eq!(format_money(Decimal::new(-100000, 2)), "-1.000,00");
    assert_eq!(format_money(Decimal::ZERO), "0,00");

    assert_eq!(format_decimal_comma(Decimal::new(150050, 2)), "1500,50");
}

fn gross_total(record: &informe::report::aggregate::ConsolidatedRecord) -> Decimal {
    record.payments.iter().map(PaymentEvent::gross).sum()
}

#[test]
fn filtering_by_every_period_keeps_totals() {
    let consolidated = consolidate(
        SourceKind::S5002,
        "1",
        vec![
            record("1", "2024-01", vec![
                payment("2024-01", "2024-01-31", vec![income("11", 100000, CodeStatus::Exact)]),
                payment("2024-01", "2024-01-15", vec![income("41", 11000, CodeStatus::Exact)]),
            ]),
            record("1", "2024-02", vec![
                payment("2024-02", "2024-02-28", vec![income("11", 120000, CodeStatus::Exact)]),
            ]),
        ],
    );

    let filtered = filter_by_periods(&consolidated, &periods_of(&consolidated));
    assert_eq!(filtered.payments.len(), consolidated.payments.len());
    assert_eq!(gross_total(&filtered), gross_total(&consolidated));
    assert_eq!(filtered, consolidated);
}

#[test]
fn payments_without_period_drop_out_of_a_full_selection() {
    let consolidated = consolidate(
        SourceKind::S5002,
        "1",
        vec![record("1", "2024-01", vec![
            payment("2024-01", "2024-01-31", vec![income("11", 100000, CodeStatus::Exact)]),
            payment("", "2024-01-10", vec![income("11", 5000, CodeStatus::Exact)]),
        ])],
    );

    let filtered = filter_by_periods(&consolidated, &periods_of(&consolidated));
    assert_eq!(filtered.payments.len(), 1);
    assert_eq!(gross_total(&filtered), Decimal::new(100000, 2));
    assert_eq!(gross_total(&consolidated), Decimal::new(105000, 2));
}
