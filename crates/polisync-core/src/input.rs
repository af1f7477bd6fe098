//! Raw operation payloads and their validation into entities.
//!
//! Payloads arrive from an outer request layer with every field optional.
//! Validation collects all missing or blank fields and either produces a
//! complete entity or a [`MissingArguments`] listing them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::MissingArguments;
use crate::types::{Claim, Client, Patch, Policy};

/// Payload for creating a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInput {
    #[serde(default, deserialize_with = "lenient")]
    pub id_cliente: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub apellido: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub dni: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub telefono: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub direccion: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ciudad: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub provincia: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub activo: Option<String>,
}

impl ClientInput {
    pub fn validate(self) -> Result<Client, MissingArguments> {
        let mut req = Required::default();
        let client = Client {
            id: req.take("id_cliente", self.id_cliente),
            first_name: req.take("nombre", self.nombre),
            last_name: req.take("apellido", self.apellido),
            national_id: req.take("dni", self.dni),
            email: req.take("email", self.email),
            phone: req.take("telefono", self.telefono),
            address: req.take("direccion", self.direccion),
            city: req.take("ciudad", self.ciudad),
            province: req.take("provincia", self.provincia),
            active: req.take("activo", self.activo),
        };
        req.finish(client)
    }
}

/// Payload for creating a policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyInput {
    #[serde(default, deserialize_with = "lenient")]
    pub nro_poliza: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub id_cliente: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tipo: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub fecha_inicio: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub fecha_fin: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub prima_mensual: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cobertura_total: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub id_agente: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub estado: Option<String>,
}

impl PolicyInput {
    pub fn validate(self) -> Result<Policy, MissingArguments> {
        let mut req = Required::default();
        let policy = Policy {
            number: req.take("nro_poliza", self.nro_poliza),
            client_id: req.take("id_cliente", self.id_cliente),
            policy_type: req.take("tipo", self.tipo),
            start_date: req.take("fecha_inicio", self.fecha_inicio),
            end_date: req.take("fecha_fin", self.fecha_fin),
            monthly_premium: req.take("prima_mensual", self.prima_mensual),
            total_coverage: req.take("cobertura_total", self.cobertura_total),
            agent_id: req.take("id_agente", self.id_agente),
            status: req.take("estado", self.estado),
        };
        req.finish(policy)
    }
}

/// Payload for creating a claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimInput {
    #[serde(default, deserialize_with = "lenient")]
    pub id_siniestro: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub nro_poliza: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub fecha: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tipo: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub monto_estimado: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub descripcion: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub estado: Option<String>,
}

impl ClaimInput {
    pub fn validate(self) -> Result<Claim, MissingArguments> {
        let mut req = Required::default();
        let claim = Claim {
            id: req.take("id_siniestro", self.id_siniestro),
            policy_number: req.take("nro_poliza", self.nro_poliza),
            date: req.take("fecha", self.fecha),
            claim_type: req.take("tipo", self.tipo),
            estimated_amount: req.take("monto_estimado", self.monto_estimado),
            description: req.take("descripcion", self.descripcion),
            status: req.take("estado", self.estado),
        };
        req.finish(claim)
    }
}

/// Partial update of a client's non-key fields.
///
/// Unknown fields, including `id_cliente`, are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub apellido: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub dni: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub telefono: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub direccion: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ciudad: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub provincia: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub activo: Option<String>,
}

impl ClientPatch {
    /// Client fields a patch may carry.
    pub const FIELDS: [&'static str; 9] = [
        "nombre",
        "apellido",
        "dni",
        "email",
        "telefono",
        "direccion",
        "ciudad",
        "provincia",
        "activo",
    ];

    /// Collect the non-blank fields into a store patch.
    pub fn into_patch(self) -> Patch {
        let mut patch = Patch::new();
        let values = [
            self.nombre,
            self.apellido,
            self.dni,
            self.email,
            self.telefono,
            self.direccion,
            self.ciudad,
            self.provincia,
            self.activo,
        ];
        for (name, value) in Self::FIELDS.into_iter().zip(values) {
            if let Some(v) = non_blank(value) {
                patch.set(name, v);
            }
        }
        patch
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Accumulates the names of required fields that were absent or blank.
#[derive(Default)]
struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    fn take(&mut self, name: &'static str, value: Option<String>) -> String {
        match non_blank(value) {
            Some(v) => v,
            None => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, MissingArguments> {
        if self.missing.is_empty() {
            Ok(value)
        } else {
            Err(MissingArguments::new(self.missing))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accept strings, numbers, and booleans, storing everything as a string.
///
/// Booleans follow the data set's `"True"`/`"False"` convention.
fn lenient<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Bool(true)) => Some("True".to_string()),
        Some(Value::Bool(false)) => Some("False".to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}
