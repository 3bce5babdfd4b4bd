//! Shared fixtures: the descriptor table of one grant application type,
//! its envelope schema, and a fully populated sample tree.

use grantdoc_codec::{
    DescriptorTable, FieldDescriptor, FieldValue, ItemField, SchemaIndex, TypedTree, ValueKind,
};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

pub fn schema_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../schema/envelope-schema.json")
}

pub fn schema_index() -> SchemaIndex {
    SchemaIndex::load(schema_path())
        .unwrap_or_else(|e| panic!("failed to load envelope schema: {}", e))
}

/// The descriptor table for the sample application type. Covers every
/// branch: bare and tagged scalars at depths 2 and 3, a depth-4 tagged
/// entry, and record lists at depths 2 and 3.
pub fn table() -> DescriptorTable {
    DescriptorTable::new(vec![
        FieldDescriptor::new("caseId", ValueKind::Text, ["metadata", "caseId"]),
        FieldDescriptor::new(
            "companyNameShort",
            ValueKind::Text,
            ["grantsProfile", "profileInfoArray", "companyNameShort"],
        ),
        FieldDescriptor::new(
            "companyHomePage",
            ValueKind::Text,
            ["grantsProfile", "profileInfoArray", "companyHomePage"],
        ),
        FieldDescriptor::new(
            "applicantType",
            ValueKind::Integer,
            ["application", "applicationInfoArray", "applicantType"],
        )
        .with_label("Applicant type"),
        FieldDescriptor::new(
            "applicationSubmitDate",
            ValueKind::DateTime,
            ["application", "applicationInfoArray", "applicationSubmitDate"],
        )
        .with_label("Submitted"),
        FieldDescriptor::new("acceptTerms", ValueKind::Boolean, ["formMeta", "acceptTerms"])
            .with_label("Terms accepted"),
        FieldDescriptor::new(
            "amount",
            ValueKind::Decimal,
            ["application", "compensationInfo", "generalInfoArray", "amount"],
        )
        .with_label("Amount"),
        FieldDescriptor::new(
            "totalAmount",
            ValueKind::Decimal,
            ["application", "compensationInfo", "totalAmount"],
        ),
        FieldDescriptor::new(
            "officials",
            ValueKind::RecordList,
            ["grantsProfile", "officialsArray"],
        )
        .with_item_fields(vec![
            ItemField::new("name", ValueKind::Text, "Name"),
            ItemField::new("role", ValueKind::Integer, "Role"),
            ItemField::new("email", ValueKind::Text, "Email"),
        ]),
        FieldDescriptor::new(
            "otherCompensations",
            ValueKind::RecordList,
            ["application", "compensationInfo", "otherCompensationsArray"],
        )
        .required(),
    ])
    .unwrap_or_else(|e| panic!("fixture table is invalid: {}", e))
}

pub fn record(pairs: Vec<(&str, FieldValue)>) -> FieldValue {
    FieldValue::Record(pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
}

pub fn decimal(repr: &str) -> FieldValue {
    FieldValue::Decimal(Decimal::from_str(repr).unwrap())
}

/// A fully populated application: every descriptor has a non-null value.
pub fn sample_tree() -> TypedTree {
    let mut tree = TypedTree::new();
    tree.insert("caseId".to_owned(), FieldValue::from("HEL-2026-0042"));
    tree.insert("companyNameShort".to_owned(), FieldValue::from("ACME"));
    tree.insert(
        "companyHomePage".to_owned(),
        FieldValue::from("https://acme.example"),
    );
    tree.insert("applicantType".to_owned(), FieldValue::Int(2));
    tree.insert(
        "applicationSubmitDate".to_owned(),
        FieldValue::DateTime("2026-03-01T12:00:00Z".to_owned()),
    );
    tree.insert("acceptTerms".to_owned(), FieldValue::Bool(true));
    tree.insert("amount".to_owned(), decimal("187.21"));
    tree.insert("totalAmount".to_owned(), decimal("1337.5"));
    tree.insert(
        "officials".to_owned(),
        FieldValue::List(vec![
            record(vec![
                ("name", FieldValue::from("Anna Virtanen")),
                ("role", FieldValue::Int(1)),
                ("email", FieldValue::from("anna@acme.example")),
            ]),
            record(vec![
                ("name", FieldValue::from("Bo Berg")),
                ("role", FieldValue::Int(2)),
            ]),
        ]),
    );
    tree.insert(
        "otherCompensations".to_owned(),
        FieldValue::List(vec![record(vec![
            ("issuer", FieldValue::from("STATE")),
            ("year", FieldValue::Int(2025)),
            ("amount", decimal("1500.50")),
        ])]),
    );
    tree
}
