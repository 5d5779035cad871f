//! CSV import of consultation lists.
//!
//! The only file-format boundary of the system. A file is accepted when it
//! is a CSV of at most 5 MB whose header carries one of the known CPF column
//! spellings; rows with a missing CPF become line-numbered warnings, and when
//! more than 20% of the rows are bad the whole import is refused.
use chrono::Utc;
use std::path::Path;
use thiserror::Error;

use crate::format::formatar_cpf;

/// Header spellings accepted for the CPF column, in the partner files seen
/// so far.
const COLUNAS_CPF: [&str; 4] = ["CPF", "cpf", "Cpf", "CPF_CLIENTE"];
const COLUNAS_NOME: [&str; 4] = ["nome", "Nome", "NOME", "CLIENTE_NOME"];
const COLUNAS_TELEFONE: [&str; 4] = ["telefone", "Telefone", "TELEFONE", "CLIENTE_CELULAR"];
const COLUNAS_ID: [&str; 2] = ["ID", "id"];

/// Spreadsheet exports routinely blow past this when someone saves the whole
/// customer base by accident.
const TAMANHO_MAXIMO: u64 = 5 * 1024 * 1024;

/// Share of bad rows above which warnings escalate to a blocking error.
const LIMITE_INVALIDOS: f64 = 0.2;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Formato de arquivo inválido. Por favor, envie um arquivo CSV.")]
    FormatoInvalido,
    #[error(
        "Arquivos Excel (.xlsx/.xls) não são suportados diretamente. \
         Por favor, exporte para CSV primeiro."
    )]
    FormatoExcel,
    #[error("O arquivo é muito grande. O tamanho máximo permitido é 5MB.")]
    ArquivoGrande,
    #[error(
        "O arquivo CSV não possui uma coluna de CPF. \
         Por favor, verifique o formato do arquivo."
    )]
    SemColunaCpf,
    #[error(
        "O arquivo contém {invalidos} CPFs inválidos de um total de {total}. \
         Verifique o formato do arquivo."
    )]
    MuitosInvalidos { invalidos: usize, total: usize },
    #[error("Erro ao processar o arquivo CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Erro ao ler o arquivo: {0}")]
    Io(#[from] std::io::Error),
}

/// One row ready to become a pending consultation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistroImportado {
    pub request_id: String,
    pub cpf: String,
    pub nome: Option<String>,
    pub telefone: Option<String>,
}

/// Outcome of a successful (possibly warning-laden) import.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub registros: Vec<RegistroImportado>,
    /// Row-level warnings (`Linha N: ...`), kept for display even when the
    /// import as a whole succeeds.
    pub avisos: Vec<String>,
    /// Data rows seen in the file, valid or not.
    pub total_linhas: usize,
}

/// Import a consultation list from a CSV file on disk.
pub fn importar_arquivo(path: &Path) -> Result<ImportReport, ImportError> {
    let extensao = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extensao.as_str() {
        "csv" => {}
        "xlsx" | "xls" => return Err(ImportError::FormatoExcel),
        _ => return Err(ImportError::FormatoInvalido),
    }

    if std::fs::metadata(path)?.len() > TAMANHO_MAXIMO {
        return Err(ImportError::ArquivoGrande);
    }

    let conteudo = std::fs::read_to_string(path)?;
    importar_texto(&conteudo)
}

/// Import a consultation list from CSV text.
pub fn importar_texto(conteudo: &str) -> Result<ImportReport, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(conteudo.as_bytes());

    let headers = reader.headers()?.clone();
    let coluna = |nomes: &[&str]| headers.iter().position(|h| nomes.contains(&h));

    let Some(idx_cpf) = coluna(&COLUNAS_CPF) else {
        return Err(ImportError::SemColunaCpf);
    };
    let idx_nome = coluna(&COLUNAS_NOME);
    let idx_telefone = coluna(&COLUNAS_TELEFONE);
    let idx_id = coluna(&COLUNAS_ID);

    let carimbo = Utc::now().timestamp_millis();
    let mut registros = Vec::new();
    let mut avisos = Vec::new();
    let mut total_linhas = 0usize;

    for (indice, resultado) in reader.records().enumerate() {
        // Header is line 1, first data row is line 2.
        let linha = indice + 2;
        total_linhas += 1;

        let record = resultado?;
        let cpf_bruto = record.get(idx_cpf).unwrap_or_default();
        if cpf_bruto.is_empty() {
            avisos.push(format!("Linha {linha}: CPF não encontrado ou vazio"));
            continue;
        }

        let campo = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let request_id = campo(idx_id)
            .unwrap_or_else(|| format!("REQ{carimbo}{indice:04}"));

        registros.push(RegistroImportado {
            request_id,
            cpf: formatar_cpf(cpf_bruto),
            nome: campo(idx_nome),
            telefone: campo(idx_telefone),
        });
    }

    if !avisos.is_empty() && avisos.len() as f64 / total_linhas as f64 > LIMITE_INVALIDOS {
        return Err(ImportError::MuitosInvalidos {
            invalidos: avisos.len(),
            total: total_linhas,
        });
    }

    Ok(ImportReport {
        registros,
        avisos,
        total_linhas,
    })
}

/// Read a customer-base CSV (nome/cpf/telefone/status columns) into the raw
/// JSON array the registration flow expects, plus the CPFs of the rows whose
/// status is `pendente` (those are the ones the partner will consult).
pub fn ler_clientes_csv(
    conteudo: &str,
) -> Result<(serde_json::Value, Vec<String>), ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(conteudo.as_bytes());

    let headers = reader.headers()?.clone();
    let idx_cpf = headers
        .iter()
        .position(|h| COLUNAS_CPF.contains(&h))
        .ok_or(ImportError::SemColunaCpf)?;
    let idx_status = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("status"));

    let mut registros = Vec::new();
    let mut pendentes = Vec::new();

    for resultado in reader.records() {
        let record = resultado?;
        let cpf_bruto = record.get(idx_cpf).unwrap_or_default();
        if cpf_bruto.is_empty() {
            continue;
        }
        let cpf = formatar_cpf(cpf_bruto);

        let mut objeto = serde_json::Map::new();
        for (indice, nome_coluna) in headers.iter().enumerate() {
            let valor = if indice == idx_cpf {
                cpf.clone()
            } else {
                record.get(indice).unwrap_or_default().to_string()
            };
            objeto.insert(nome_coluna.to_string(), serde_json::Value::String(valor));
        }

        let status = idx_status
            .and_then(|i| record.get(i))
            .unwrap_or_default()
            .to_lowercase();
        if status == "pendente" {
            pendentes.push(cpf);
        }
        registros.push(serde_json::Value::Object(objeto));
    }

    Ok((serde_json::Value::Array(registros), pendentes))
}
