// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Reading older type shapes through version strategies.

use chrono::NaiveDate;
use weft::{
    impl_object, shared, Error, ErrorCategory, ExtraData, FieldMapping, ObjectHooks, Ref,
    TransformStrategy, Value, VersionStrategy, Weft,
};

#[derive(Default)]
struct PersonV1 {
    name: String,
    age: i32,
}

impl_object!(class PersonV1("hr.PersonV1") { name: String, age: i32 });

#[derive(Default, Debug, PartialEq)]
struct Person {
    name: String,
    dob: Option<NaiveDate>,
}

impl_object!(class Person("hr.Person") { name: String, dob: Option<NaiveDate> });

/// Ages are counted back from a fixed day so the result does not depend on
/// when the test runs.
fn upgrade() -> TransformStrategy {
    TransformStrategy::new()
        .map_type("hr.PersonV1", "hr.Person")
        .unmapped_field("hr.PersonV1", "age")
        .on_finalize::<Person, _, _>("hr.PersonV1", |person, extras| {
            let age = extras
                .get("age")
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::version_transform("PersonV1 without an age"))?;
            person.dob = NaiveDate::from_ymd_opt(2024 - age as i32, 1, 1);
            Ok(())
        })
}

#[test]
fn test_age_becomes_date_of_birth() {
    let weft = Weft::default();
    let old = vec![
        shared(PersonV1 {
            name: "Ada".to_string(),
            age: 30,
        }),
        shared(PersonV1 {
            name: "Grace".to_string(),
            age: 85,
        }),
    ];
    let bytes = weft.serialize(&old).unwrap();

    let people: Vec<Ref<Person>> = weft.deserialize_with(&bytes, &upgrade()).unwrap();
    assert_eq!(
        *people[0].borrow(),
        Person {
            name: "Ada".to_string(),
            dob: NaiveDate::from_ymd_opt(1994, 1, 1),
        }
    );
    assert_eq!(people[1].borrow().dob, NaiveDate::from_ymd_opt(1939, 1, 1));
}

#[test]
fn test_without_strategy_the_old_name_does_not_resolve() {
    let weft = Weft::default();
    let bytes = weft
        .serialize(&shared(PersonV1 {
            name: "Ada".to_string(),
            age: 30,
        }))
        .unwrap();
    let err = weft.deserialize::<Ref<Person>>(&bytes).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeResolution);
}

#[test]
fn test_rejected_field_fails_the_call() {
    let weft = Weft::default();
    let bytes = weft
        .serialize(&shared(PersonV1 {
            name: "Ada".to_string(),
            age: 30,
        }))
        .unwrap();
    let strategy = TransformStrategy::new()
        .map_type("hr.PersonV1", "hr.Person")
        .reject_field("hr.PersonV1", "age");
    let err = weft
        .deserialize_with::<Ref<Person>>(&bytes, &strategy)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::VersionTransform);
    assert!(err.to_string().contains("age"));
}

#[test]
fn test_finalize_errors_surface() {
    let weft = Weft::default();
    let bytes = weft
        .serialize(&shared(PersonV1 {
            name: "Ada".to_string(),
            age: 30,
        }))
        .unwrap();
    // `age` is assigned nowhere and dropped, so finalize sees no extras
    let strategy = upgrade().drop_field("hr.PersonV1", "age");
    let err = weft
        .deserialize_with::<Ref<Person>>(&bytes, &strategy)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::VersionTransform);
}

#[derive(Default)]
struct ContactV1 {
    name: String,
    phone: String,
    email: String,
    tags: Vec<String>,
}

impl_object!(value ContactV1("crm.Contact") {
    name: String,
    phone: String,
    email: String,
    tags: Vec<String>,
});

#[derive(Default, Debug)]
struct Contact {
    email: String,
    name: String,
    extras: ExtraData,
}

impl ObjectHooks for Contact {
    fn weft_construct() -> Option<Self> {
        Some(Contact::default())
    }

    fn weft_extras(&mut self) -> Option<&mut ExtraData> {
        Some(&mut self.extras)
    }
}

impl_object!(value Contact("crm.Contact") with hooks { email: String, name: String } transient { extras: ExtraData });

#[test]
fn test_removed_fields_land_in_the_extras_bag() {
    let writer = Weft::default();
    let bytes = writer
        .serialize(&ContactV1 {
            name: "Ada".to_string(),
            phone: "+44 20 7946 0000".to_string(),
            email: "ada@example.org".to_string(),
            tags: vec!["math".to_string(), "engines".to_string()],
        })
        .unwrap();

    let contact: Contact = Weft::default().deserialize(&bytes).unwrap();
    assert_eq!(contact.name, "Ada");
    assert_eq!(contact.email, "ada@example.org");
    assert_eq!(contact.extras.len(), 2);
    assert_eq!(
        contact.extras.get("phone").and_then(Value::as_str),
        Some("+44 20 7946 0000")
    );
    let tags = contact.extras.get("tags").and_then(Value::as_list).unwrap();
    assert_eq!(tags, [Value::from("math"), Value::from("engines")]);
}

/// Hand-written strategy that drops two fields and upper-cases the name.
struct Uppercase;

impl VersionStrategy for Uppercase {
    fn map_field(&self, wire_type: &str, wire_field: &str) -> FieldMapping {
        match (wire_type, wire_field) {
            ("crm.Contact", "phone") => FieldMapping::Drop,
            ("crm.Contact", "tags") => FieldMapping::Drop,
            _ => FieldMapping::Same,
        }
    }

    fn finalize(
        &self,
        _wire_type: &str,
        target: &mut dyn std::any::Any,
        _extras: &ExtraData,
    ) -> Result<(), Error> {
        if let Some(contact) = target.downcast_mut::<Contact>() {
            contact.name = contact.name.to_uppercase();
        }
        Ok(())
    }
}

#[test]
fn test_custom_strategy_drops_and_finalizes() {
    let writer = Weft::default();
    let bytes = writer
        .serialize(&ContactV1 {
            name: "Ada".to_string(),
            phone: "0".to_string(),
            email: "a@b".to_string(),
            tags: vec![],
        })
        .unwrap();
    let contact: Contact = Weft::default().deserialize_with(&bytes, &Uppercase).unwrap();
    assert_eq!(contact.name, "ADA");
    assert!(contact.extras.is_empty());
}
