//! CSV export of campaign snapshots and consultation history.
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;

use crate::db::ConsultaRow;
use crate::format::{formatar_data_hora, mascarar_cpf};

/// Campaign snapshot export. Every record goes out regardless of status, so
/// an export taken mid-campaign shows pending rows too.
pub fn exportar_campanha<W: Write>(destino: W, registros: &[ConsultaRow]) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(destino);

    writer.write_record([
        "ID",
        "CPF",
        "Nome",
        "Telefone",
        "Status",
        "Valor Liberado",
        "Banco",
        "Mensagem",
        "Log",
    ])?;

    for registro in registros {
        let valor = registro
            .valor_liberado
            .map(|v| format!("{v:.2}"))
            .unwrap_or_default();
        writer.write_record([
            registro.request_id.as_str(),
            registro.cpf.as_str(),
            registro.nome.as_deref().unwrap_or(""),
            registro.telefone.as_deref().unwrap_or(""),
            registro.status.rotulo(),
            valor.as_str(),
            registro.banco.as_deref().unwrap_or(""),
            registro.mensagem.as_deref().unwrap_or(""),
            registro.log.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// History export, with masked CPFs and pt-BR dates as shown on screen.
pub fn exportar_historico<W: Write>(destino: W, registros: &[ConsultaRow]) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(destino);

    writer.write_record([
        "ID",
        "Campanha",
        "Request ID",
        "CPF",
        "Nome",
        "Telefone",
        "Status",
        "Valor Liberado",
        "Banco",
        "Mensagem",
        "Log",
        "Data",
    ])?;

    for registro in registros {
        let id = registro.id.to_string();
        let campanha = registro
            .campanha_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let cpf = mascarar_cpf(&registro.cpf);
        let valor = registro
            .valor_liberado
            .map(|v| format!("{v:.2}"))
            .unwrap_or_default();
        let data = formatar_data_hora(&registro.created_at.to_rfc3339());
        writer.write_record([
            id.as_str(),
            campanha.as_str(),
            registro.request_id.as_str(),
            cpf.as_str(),
            registro.nome.as_deref().unwrap_or(""),
            registro.telefone.as_deref().unwrap_or(""),
            registro.status.rotulo(),
            valor.as_str(),
            registro.banco.as_deref().unwrap_or(""),
            registro.mensagem.as_deref().unwrap_or(""),
            registro.log.as_deref().unwrap_or(""),
            data.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Proposal tracking export.
pub fn exportar_propostas<W: Write>(
    destino: W,
    propostas: &[crate::db::PropostaRow],
) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(destino);

    writer.write_record([
        "ID",
        "Cliente",
        "CPF",
        "Banco",
        "Valor",
        "Status",
        "Data Envio",
        "Data Situação",
    ])?;

    for proposta in propostas {
        let id = proposta.id.to_string();
        let cpf = mascarar_cpf(&proposta.cpf);
        let valor = format!("{:.2}", proposta.valor);
        let envio = formatar_data_hora(&proposta.data_envio.to_rfc3339());
        let situacao = proposta
            .data_situacao
            .map(|d| formatar_data_hora(&d.to_rfc3339()))
            .unwrap_or_default();
        writer.write_record([
            id.as_str(),
            proposta.cliente.as_str(),
            cpf.as_str(),
            proposta.banco.as_str(),
            valor.as_str(),
            proposta.status.rotulo(),
            envio.as_str(),
            situacao.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Timestamped download-style filename, e.g.
/// `resultados_campanha_2024-05-10T12-30-00-000Z.csv`.
pub fn nome_arquivo(prefixo: &str, agora: DateTime<Utc>) -> String {
    let carimbo = agora
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{prefixo}_{carimbo}.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusConsulta;
    use chrono::TimeZone;

    fn registro(cpf: &str, status: StatusConsulta) -> ConsultaRow {
        ConsultaRow {
            id: 1,
            campanha_id: Some(7),
            request_id: "REQ1".into(),
            cpf: cpf.into(),
            nome: Some("Jane".into()),
            telefone: None,
            status,
            valor_liberado: Some(3500.0),
            banco: Some("FACTA".into()),
            mensagem: None,
            log: None,
            api_response: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 10, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn snapshot_tem_cabecalho_mais_uma_linha_por_registro() {
        let registros = vec![
            registro("12345678900", StatusConsulta::ComSaldo),
            registro("98765432100", StatusConsulta::Pendente),
        ];
        let mut saida = Vec::new();
        exportar_campanha(&mut saida, &registros).unwrap();
        let texto = String::from_utf8(saida).unwrap();
        let linhas: Vec<&str> = texto.lines().collect();
        assert_eq!(linhas.len(), registros.len() + 1);
        assert!(linhas[1].contains("\"Com Saldo\""));
        assert!(linhas[2].contains("\"Pendente\""));
        assert!(linhas[1].contains("\"3500.00\""));
    }

    #[test]
    fn historico_mascara_cpf_e_formata_data() {
        let registros = vec![registro("12345678900", StatusConsulta::SemSaldo)];
        let mut saida = Vec::new();
        exportar_historico(&mut saida, &registros).unwrap();
        let texto = String::from_utf8(saida).unwrap();
        assert!(texto.contains("\"123.456.789-00\""));
        assert!(texto.contains("\"10/05/2024 12:30:00\""));
    }

    #[test]
    fn nome_de_arquivo_sem_caracteres_proibidos() {
        let agora = Utc.with_ymd_and_hms(2024, 5, 10, 12, 30, 0).unwrap();
        let nome = nome_arquivo("resultados_campanha", agora);
        assert!(nome.starts_with("resultados_campanha_2024-05-10T12-30-00"));
        assert!(nome.ends_with(".csv"));
        assert!(!nome.contains(':'));
    }
}
