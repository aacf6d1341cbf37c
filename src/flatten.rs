//! Flattening typed values into template contexts.
//!
//! A value's *declared fields* are the members its `Serialize` impl emits at
//! the top level. Nested values stay nested (they become JSON objects), so
//! templates can still write `empresa.nombre`.
//!
//! Values that extend a parent record expose it through [`Ancestry`]; the
//! parent field is normally `#[serde(skip)]` so that it only contributes via
//! [`flatten_with_ancestors`].
//!
//! A member that fails to serialize is logged as a [`FieldAccessError`] and
//! left out. Flattening itself never fails.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::ser::{self, Impossible, Serialize, SerializeMap, SerializeStruct};
use serde_json::Value;

use crate::context::Context;
use crate::error::FieldAccessError;

/// Link from a value to the record it extends.
pub trait Ancestry {
    /// The parent record whose fields are inherited, if any.
    fn parent(&self) -> Option<&dyn Flatten> {
        None
    }
}

/// Object-safe view of a flattenable value.
///
/// Implemented for every `Serialize + Ancestry` type; do not implement it by
/// hand.
pub trait Flatten {
    /// Top-level fields of this value only.
    fn declared_fields(&self) -> BTreeMap<String, Value>;

    /// The next record up the chain.
    fn ancestor(&self) -> Option<&dyn Flatten>;
}

impl<T: Serialize + Ancestry> Flatten for T {
    fn declared_fields(&self) -> BTreeMap<String, Value> {
        match self.serialize(FieldCollector) {
            Ok(fields) => fields,
            Err(NotAMapping(kind)) => {
                log::warn!("Cannot flatten a {kind} into template variables; using an empty context");
                BTreeMap::new()
            }
        }
    }

    fn ancestor(&self) -> Option<&dyn Flatten> {
        Ancestry::parent(self)
    }
}

/// Fields declared directly on `value`.
///
/// `None`, unit and empty values give an empty context.
pub fn flatten<T: Flatten + ?Sized>(value: &T) -> Context {
    Context::from(value.declared_fields())
}

/// Fields of `value` plus every field inherited through [`Ancestry`].
///
/// When a name occurs at several levels the most-derived one wins.
pub fn flatten_with_ancestors<T: Flatten + ?Sized>(value: &T) -> Context {
    let mut fields = value.declared_fields();
    let mut next = value.ancestor();
    while let Some(current) = next {
        for (name, field) in current.declared_fields() {
            fields.entry(name).or_insert(field);
        }
        next = current.ancestor();
    }
    Context::from(fields)
}

/// Like [`flatten`], without the listed names. Unknown names are ignored.
pub fn flatten_excluding<T: Flatten + ?Sized>(value: &T, excluded: &[&str]) -> Context {
    let mut fields = value.declared_fields();
    fields.retain(|name, _| !excluded.contains(&name.as_str()));
    Context::from(fields)
}

// ---------------------------------------------------------------------------
// Ancestry for common free-form containers
// ---------------------------------------------------------------------------

impl<T: Ancestry> Ancestry for Option<T> {
    fn parent(&self) -> Option<&dyn Flatten> {
        self.as_ref().and_then(|value| value.parent())
    }
}

impl<T: Ancestry + ?Sized> Ancestry for &T {
    fn parent(&self) -> Option<&dyn Flatten> {
        (**self).parent()
    }
}

impl<T: Ancestry + ?Sized> Ancestry for Box<T> {
    fn parent(&self) -> Option<&dyn Flatten> {
        (**self).parent()
    }
}

impl<K, V, S> Ancestry for HashMap<K, V, S> {}
impl<K, V> Ancestry for BTreeMap<K, V> {}
impl Ancestry for Value {}
impl Ancestry for serde_json::Map<String, Value> {}
impl Ancestry for () {}

// ---------------------------------------------------------------------------
// FieldCollector – a serializer that keeps only the top level
// ---------------------------------------------------------------------------

/// Raised when the value is not a record or map.
#[derive(Debug)]
struct NotAMapping(String);

impl fmt::Display for NotAMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value is a {}, not a mapping", self.0)
    }
}

impl std::error::Error for NotAMapping {}

impl ser::Error for NotAMapping {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        NotAMapping(msg.to_string())
    }
}

struct FieldCollector;

/// Accumulates captured fields; shared by struct and map serialization.
#[derive(Default)]
struct Fields {
    captured: BTreeMap<String, Value>,
    pending_key: Option<String>,
}

impl Fields {
    fn capture<T: Serialize + ?Sized>(&mut self, name: String, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.captured.insert(name, v);
            }
            Err(e) => {
                let err = FieldAccessError {
                    field: name,
                    reason: e.to_string(),
                };
                log::warn!("Skipping field: {err}");
            }
        }
    }
}

fn key_to_string<T: Serialize + ?Sized>(key: &T) -> Result<String, String> {
    match serde_json::to_value(key) {
        Ok(Value::String(s)) => Ok(s),
        Ok(Value::Number(n)) => Ok(n.to_string()),
        Ok(Value::Bool(b)) => Ok(b.to_string()),
        Ok(other) => Err(format!("unsupported map key {other}")),
        Err(e) => Err(e.to_string()),
    }
}

type Done = BTreeMap<String, Value>;

macro_rules! not_a_mapping {
    ($($method:ident($($arg:ty),*) => $kind:expr;)*) => {
        $(
            fn $method(self, $(_: $arg),*) -> Result<Done, NotAMapping> {
                Err(NotAMapping($kind.into()))
            }
        )*
    };
}

impl ser::Serializer for FieldCollector {
    type Ok = Done;
    type Error = NotAMapping;
    type SerializeSeq = Impossible<Done, NotAMapping>;
    type SerializeTuple = Impossible<Done, NotAMapping>;
    type SerializeTupleStruct = Impossible<Done, NotAMapping>;
    type SerializeTupleVariant = Impossible<Done, NotAMapping>;
    type SerializeMap = Fields;
    type SerializeStruct = Fields;
    type SerializeStructVariant = Fields;

    not_a_mapping! {
        serialize_bool(bool) => "boolean";
        serialize_i8(i8) => "number";
        serialize_i16(i16) => "number";
        serialize_i32(i32) => "number";
        serialize_i64(i64) => "number";
        serialize_u8(u8) => "number";
        serialize_u16(u16) => "number";
        serialize_u32(u32) => "number";
        serialize_u64(u64) => "number";
        serialize_f32(f32) => "number";
        serialize_f64(f64) => "number";
        serialize_char(char) => "character";
        serialize_str(&str) => "string";
        serialize_bytes(&[u8]) => "byte string";
        serialize_unit_variant(&'static str, u32, &'static str) => "unit variant";
    }

    fn serialize_none(self) -> Result<Done, NotAMapping> {
        Ok(Done::new())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Done, NotAMapping> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Done, NotAMapping> {
        Ok(Done::new())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Done, NotAMapping> {
        Ok(Done::new())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Done, NotAMapping> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Done, NotAMapping> {
        let mut fields = Fields::default();
        fields.capture(variant.to_string(), value);
        Ok(fields.captured)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, NotAMapping> {
        Err(NotAMapping("sequence".into()))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, NotAMapping> {
        Err(NotAMapping("tuple".into()))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, NotAMapping> {
        Err(NotAMapping("tuple struct".into()))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, NotAMapping> {
        Err(NotAMapping("tuple variant".into()))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Fields, NotAMapping> {
        Ok(Fields::default())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Fields, NotAMapping> {
        Ok(Fields::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Fields, NotAMapping> {
        Ok(Fields::default())
    }
}

impl SerializeStruct for Fields {
    type Ok = Done;
    type Error = NotAMapping;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), NotAMapping> {
        self.capture(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Done, NotAMapping> {
        Ok(self.captured)
    }
}

impl ser::SerializeStructVariant for Fields {
    type Ok = Done;
    type Error = NotAMapping;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), NotAMapping> {
        self.capture(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Done, NotAMapping> {
        Ok(self.captured)
    }
}

impl SerializeMap for Fields {
    type Ok = Done;
    type Error = NotAMapping;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), NotAMapping> {
        match key_to_string(key) {
            Ok(name) => self.pending_key = Some(name),
            Err(reason) => {
                log::warn!("Skipping map entry with unreadable key: {reason}");
                self.pending_key = None;
            }
        }
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NotAMapping> {
        if let Some(name) = self.pending_key.take() {
            self.capture(name, value);
        }
        Ok(())
    }

    fn end(self) -> Result<Done, NotAMapping> {
        Ok(self.captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde::{Serialize, Serializer};
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Emisora {
        clave: String,
        razon_social: String,
    }

    impl Ancestry for Emisora {}

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Aviso {
        #[serde(skip)]
        emisora: Emisora,
        clave: String,
        causas: Option<String>,
        empresa: Emisora,
    }

    impl Ancestry for Aviso {
        fn parent(&self) -> Option<&dyn Flatten> {
            Some(&self.emisora)
        }
    }

    struct Unreadable;

    impl Serialize for Unreadable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("access denied"))
        }
    }

    #[derive(Serialize)]
    struct Partial {
        visible: u32,
        hidden: Unreadable,
    }

    impl Ancestry for Partial {}

    fn aviso() -> Aviso {
        Aviso {
            emisora: Emisora {
                clave: "BASE".into(),
                razon_social: "ACTINVER CASA DE BOLSA".into(),
            },
            clave: "ACTIN".into(),
            causas: None,
            empresa: Emisora {
                clave: "BMV".into(),
                razon_social: "Bolsa Mexicana de Valores".into(),
            },
        }
    }

    #[test]
    fn declared_fields_only() {
        let ctx = flatten(&aviso());
        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.get("clave"), Some(&json!("ACTIN")));
        assert_eq!(ctx.get("causas"), Some(&Value::Null));
        assert!(!ctx.contains_key("razonSocial"));
        // Nested values stay nested.
        assert_eq!(ctx.get("empresa").unwrap()["clave"], json!("BMV"));
    }

    #[test]
    fn ancestors_contribute_but_derived_wins() {
        let ctx = flatten_with_ancestors(&aviso());
        assert_eq!(ctx.get("clave"), Some(&json!("ACTIN")));
        assert_eq!(ctx.get("razonSocial"), Some(&json!("ACTINVER CASA DE BOLSA")));
    }

    #[test]
    fn excluding_drops_named_fields_and_ignores_unknown() {
        let ctx = flatten_excluding(&aviso(), &["causas", "noExiste"]);
        assert!(!ctx.contains_key("causas"));
        assert!(ctx.contains_key("clave"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn none_and_unit_are_empty() {
        let missing: Option<Emisora> = None;
        assert!(flatten(&missing).is_empty());
        assert!(flatten_with_ancestors(&missing).is_empty());
        assert!(flatten(&()).is_empty());
    }

    #[test]
    fn scalars_flatten_to_empty() {
        assert!(flatten(&json!(42)).is_empty());
        assert!(flatten(&json!(["a", "b"])).is_empty());
    }

    #[test]
    fn unreadable_field_is_skipped() {
        let ctx = flatten(&Partial {
            visible: 7,
            hidden: Unreadable,
        });
        assert_eq!(ctx.get("visible"), Some(&json!(7)));
        assert!(!ctx.contains_key("hidden"));
    }

    #[test]
    fn maps_flatten_by_key() {
        let mut map = HashMap::new();
        map.insert(1u32, "uno");
        map.insert(2u32, "dos");
        let ctx = flatten(&map);
        assert_eq!(ctx.get("1"), Some(&json!("uno")));
        assert_eq!(ctx.len(), 2);
    }
}
