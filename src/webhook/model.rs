//! Typed views over the partner's ad hoc JSON payloads.
//!
//! The webhook host gives no schema guarantees: numeric fields arrive as
//! strings or numbers depending on the flow version, and the installment
//! schedule exists in two incompatible shapes. Everything here reads through
//! `serde_json::Value` with fallbacks instead of rigid structs.
use serde_json::Value;

use crate::model::{Parcela, StatusConsulta};

/// Classified result of one balance consultation.
#[derive(Debug, Clone, PartialEq)]
pub struct Desfecho {
    pub status: StatusConsulta,
    pub nome: Option<String>,
    pub valor_liberado: Option<f64>,
    pub banco: Option<String>,
    pub mensagem: Option<String>,
    pub parcelas: Vec<Parcela>,
    pub bruto: Value,
}

/// Classify a consultation response: `codigo == "SIM"` means the customer
/// has withdrawable balance, `"NAO"` means none, and anything else counts as
/// an error outcome recorded against the one record.
pub fn classificar(resposta: Value) -> Desfecho {
    let status = match resposta.get("codigo").and_then(Value::as_str) {
        Some("SIM") => StatusConsulta::ComSaldo,
        Some("NAO") => StatusConsulta::SemSaldo,
        _ => StatusConsulta::Erro,
    };
    let mensagem = campo_texto(&resposta, "mensagem");
    Desfecho {
        status,
        nome: campo_texto(&resposta, "nome"),
        valor_liberado: campo_numerico(&resposta, "valorliberado"),
        banco: campo_texto(&resposta, "banco"),
        mensagem,
        parcelas: normalizar_parcelas(&resposta),
        bruto: resposta,
    }
}

/// Normalize `parcelasjson` into a single schedule representation.
///
/// Two shapes exist in the wild: a plain list of `{dueDate, amount}` objects,
/// and the Pine/Facta flattened form where entry N carries `dataRepasse_N` and
/// `valor_N` (1-based, comma decimal separator). The flattened form is
/// detected from the first entry's keys and reassembled by sequential index;
/// entries with an empty date or non-positive amount are dropped.
pub fn normalizar_parcelas(resposta: &Value) -> Vec<Parcela> {
    let Some(lista) = resposta.get("parcelasjson").and_then(Value::as_array) else {
        return Vec::new();
    };
    let Some(primeiro) = lista.first().and_then(Value::as_object) else {
        return Vec::new();
    };

    let achatado = primeiro
        .keys()
        .any(|k| k.starts_with("dataRepasse_") || k.starts_with("valor_"));

    if achatado {
        lista
            .iter()
            .enumerate()
            .filter_map(|(indice, item)| {
                let n = indice + 1;
                let vencimento = item
                    .get(format!("dataRepasse_{n}"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let valor = item
                    .get(format!("valor_{n}"))
                    .map(valor_flexivel)
                    .unwrap_or(0.0);
                if vencimento.is_empty() || valor <= 0.0 {
                    return None;
                }
                Some(Parcela { vencimento, valor })
            })
            .collect()
    } else {
        lista
            .iter()
            .filter_map(|item| {
                let vencimento = item.get("dueDate")?.as_str()?.to_string();
                let valor = item.get("amount").map(valor_flexivel).unwrap_or(0.0);
                Some(Parcela { vencimento, valor })
            })
            .collect()
    }
}

/// Acknowledgement of a bulk submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoteAceite {
    pub batch_id: String,
    pub status: Option<String>,
    pub registros_invalidos: Vec<RegistroInvalido>,
}

/// A row the partner refused during bulk submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistroInvalido {
    pub cpf: String,
    pub nome: String,
    pub erro: String,
}

/// Read the bulk-submit acknowledgement. A response without `batch.batch_id`
/// is an error; the partner's own `message` field is surfaced when present.
pub fn ler_lote_aceite(resposta: &Value) -> Result<LoteAceite, String> {
    let Some(batch_id) = resposta
        .pointer("/batch/batch_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    else {
        let mensagem = resposta
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Erro ao processar o lote.");
        return Err(mensagem.to_string());
    };

    let registros_invalidos = resposta
        .get("registros_invalidos")
        .and_then(Value::as_array)
        .map(|itens| {
            itens
                .iter()
                .map(|item| RegistroInvalido {
                    cpf: campo_texto(item, "cpf").unwrap_or_default(),
                    nome: campo_texto(item, "nome").unwrap_or_default(),
                    erro: campo_texto(item, "erro").unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(LoteAceite {
        batch_id: batch_id.to_string(),
        status: resposta.pointer("/batch/status").and_then(Value::as_str).map(String::from),
        registros_invalidos,
    })
}

/// One VCTEX protocol entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocolo {
    pub data: String,
    pub protocolo: String,
}

/// Read the protocol list; an absent or malformed `merged` array yields an
/// empty list rather than an error.
pub fn ler_protocolos(resposta: &Value) -> Vec<Protocolo> {
    resposta
        .get("merged")
        .and_then(Value::as_array)
        .map(|itens| {
            itens
                .iter()
                .filter_map(|item| {
                    Some(Protocolo {
                        data: campo_texto(item, "data")?,
                        protocolo: campo_texto(item, "protocolo")?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Detail of a VCTEX protocol lookup: the CPF list under `slc.body.cpf` and
/// the batch-query panel under `resposta`. Either half may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultaProtocolo {
    pub cpfs: Option<Vec<String>>,
    pub resumo: Option<ResumoBatchQuery>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumoBatchQuery {
    pub message: Option<String>,
    pub batch_query_id: Option<String>,
    pub limite_mensal: Option<i64>,
    pub restantes_no_mes: Option<i64>,
    pub pendentes_fim_do_dia: Vec<String>,
    pub bruto: Value,
}

pub fn ler_consulta_protocolo(resposta: &Value) -> ConsultaProtocolo {
    let cpfs = resposta
        .pointer("/slc/body/cpf")
        .and_then(Value::as_array)
        .map(|itens| {
            itens
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        });

    let resumo = resposta.get("resposta").filter(|r| r.is_object()).map(|r| {
        ResumoBatchQuery {
            message: campo_texto(r, "message"),
            batch_query_id: campo_texto(r, "batchQueryId"),
            limite_mensal: r.get("batchQueriesLimit").and_then(Value::as_i64),
            restantes_no_mes: r
                .get("batchQueriesToBeDoneOnThisMonth")
                .and_then(Value::as_i64),
            pendentes_fim_do_dia: r
                .get("listOfbatchQueriesToBeMadeAtTheEndOfTheDay")
                .and_then(Value::as_array)
                .map(|itens| {
                    itens
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            bruto: r.clone(),
        }
    });

    ConsultaProtocolo { cpfs, resumo }
}

fn campo_texto(valor: &Value, campo: &str) -> Option<String> {
    valor
        .get(campo)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn campo_numerico(valor: &Value, campo: &str) -> Option<f64> {
    valor.get(campo).map(valor_flexivel).filter(|v| *v != 0.0)
}

/// Monetary fields arrive either as JSON numbers or as strings, sometimes
/// with a comma decimal separator.
fn valor_flexivel(valor: &Value) -> f64 {
    match valor {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifica_codigo_sim() {
        let desfecho = classificar(json!({
            "codigo": "SIM",
            "nome": "Jane Roe",
            "valorliberado": "3500.00",
            "banco": "FACTA",
        }));
        assert_eq!(desfecho.status, StatusConsulta::ComSaldo);
        assert_eq!(desfecho.nome.as_deref(), Some("Jane Roe"));
        assert_eq!(desfecho.valor_liberado, Some(3500.0));
        assert_eq!(desfecho.banco.as_deref(), Some("FACTA"));
    }

    #[test]
    fn classifica_codigo_nao_e_desconhecido() {
        assert_eq!(
            classificar(json!({"codigo": "NAO"})).status,
            StatusConsulta::SemSaldo
        );
        assert_eq!(
            classificar(json!({"codigo": "TALVEZ"})).status,
            StatusConsulta::Erro
        );
        assert_eq!(classificar(json!({})).status, StatusConsulta::Erro);
    }

    #[test]
    fn valor_liberado_como_numero_ou_texto() {
        let a = classificar(json!({"codigo": "SIM", "valorliberado": 1234.5}));
        let b = classificar(json!({"codigo": "SIM", "valorliberado": "1234,50"}));
        assert_eq!(a.valor_liberado, Some(1234.5));
        assert_eq!(b.valor_liberado, Some(1234.5));
    }

    #[test]
    fn parcelas_formato_padrao() {
        let parcelas = normalizar_parcelas(&json!({
            "parcelasjson": [
                {"dueDate": "2024-05-10", "amount": 120.5},
                {"dueDate": "2025-05-10", "amount": 98.0},
            ]
        }));
        assert_eq!(parcelas.len(), 2);
        assert_eq!(parcelas[0].vencimento, "2024-05-10");
        assert_eq!(parcelas[1].valor, 98.0);
    }

    #[test]
    fn parcelas_formato_achatado() {
        let parcelas = normalizar_parcelas(&json!({
            "parcelasjson": [
                {"dataRepasse_1": "10/05/2024", "valor_1": "120,50"},
                {"dataRepasse_2": "10/05/2025", "valor_2": "98,00"},
                {"dataRepasse_3": "", "valor_3": "50,00"},
            ]
        }));
        assert_eq!(parcelas.len(), 2);
        assert_eq!(parcelas[0].vencimento, "10/05/2024");
        assert_eq!(parcelas[0].valor, 120.5);
        assert_eq!(parcelas[1].valor, 98.0);
    }

    #[test]
    fn parcelas_ausentes_ou_vazias() {
        assert!(normalizar_parcelas(&json!({})).is_empty());
        assert!(normalizar_parcelas(&json!({"parcelasjson": []})).is_empty());
    }

    #[test]
    fn lote_aceite_completo() {
        let aceite = ler_lote_aceite(&json!({
            "batch": {"batch_id": "b-123", "status": "aguardando"},
            "registros_invalidos": [
                {"cpf": "000", "nome": "X", "erro": "cpf invalido"}
            ]
        }))
        .unwrap();
        assert_eq!(aceite.batch_id, "b-123");
        assert_eq!(aceite.status.as_deref(), Some("aguardando"));
        assert_eq!(aceite.registros_invalidos.len(), 1);
        assert_eq!(aceite.registros_invalidos[0].erro, "cpf invalido");
    }

    #[test]
    fn lote_recusado_usa_mensagem_do_parceiro() {
        let err = ler_lote_aceite(&json!({"message": "arquivo duplicado"})).unwrap_err();
        assert_eq!(err, "arquivo duplicado");
        let err = ler_lote_aceite(&json!({})).unwrap_err();
        assert!(err.contains("Erro ao processar"));
    }

    #[test]
    fn protocolos_merged_ausente() {
        assert!(ler_protocolos(&json!({"outra": 1})).is_empty());
        let lista = ler_protocolos(&json!({
            "merged": [{"data": "2024-02-01 10:00:00", "protocolo": "P-1"}]
        }));
        assert_eq!(lista.len(), 1);
        assert_eq!(lista[0].protocolo, "P-1");
    }

    #[test]
    fn consulta_protocolo_parcial() {
        let detalhe = ler_consulta_protocolo(&json!({
            "slc": {"body": {"cpf": ["111", "222"]}}
        }));
        assert_eq!(detalhe.cpfs.as_deref(), Some(&["111".to_string(), "222".to_string()][..]));
        assert!(detalhe.resumo.is_none());

        let detalhe = ler_consulta_protocolo(&json!({
            "resposta": {"message": "ok", "batchQueryId": "q-9", "batchQueriesLimit": 100}
        }));
        assert!(detalhe.cpfs.is_none());
        let resumo = detalhe.resumo.unwrap();
        assert_eq!(resumo.batch_query_id.as_deref(), Some("q-9"));
        assert_eq!(resumo.limite_mensal, Some(100));
    }
}
