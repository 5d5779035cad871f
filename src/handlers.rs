//! CLI operation handlers: thin orchestration over the repositories and the
//! webhook client, with the operator-facing messages of each screen.
use anyhow::{anyhow, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::db;
use crate::export;
use crate::facta;
use crate::format::{formatar_data, formatar_data_hora, formatar_telefone, mascarar_cpf};
use crate::historico::{self, FiltroHistorico};
use crate::importer;
use crate::model::{Ambiente, Credenciais, LoteRemoto, StatusProposta};
use crate::propostas::{self, FiltroPropostas, NovaProposta};
use crate::webhook::model::{classificar, ler_consulta_protocolo, ler_lote_aceite, ler_protocolos};
use crate::webhook::{ConsultaApi, RegistroLote};
use crate::{campanha, importer::ImportReport};

/// Normalize and check a CPF typed by the operator: the full 11 digits are
/// required here, unlike the CSV path where short values are zero-padded.
fn cpf_completo(entrada: &str) -> Result<String> {
    let digitos: String = entrada.chars().filter(char::is_ascii_digit).collect();
    if digitos.len() != 11 {
        return Err(anyhow!("CPF inválido. Digite um CPF completo."));
    }
    Ok(digitos)
}

// ---------------------------------------------------------------------------
// Individual query
// ---------------------------------------------------------------------------

pub async fn consultar(
    pool: &SqlitePool,
    api: &dyn ConsultaApi,
    cpf_entrada: &str,
    json: bool,
) -> Result<()> {
    let cpf = cpf_completo(cpf_entrada)?;
    let resposta = api.consultar_cpf(&cpf).await?;
    let desfecho = classificar(resposta);

    let request_id = format!("REQ{}", Utc::now().timestamp_millis());
    db::inserir_consulta_avulsa(pool, &request_id, &cpf, &desfecho).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&desfecho.bruto)?);
        return Ok(());
    }

    println!("Resultado da Consulta");
    println!("CPF Consultado: {}", mascarar_cpf(&cpf));
    println!(
        "Data da Consulta: {}",
        Utc::now().format("%d/%m/%Y %H:%M:%S")
    );
    println!();
    if desfecho.status == crate::model::StatusConsulta::ComSaldo {
        println!("Cliente com saldo disponível");
        if let Some(nome) = &desfecho.nome {
            println!("Nome: {nome}");
        }
        if let Some(valor) = desfecho.valor_liberado {
            println!("Valor liberado: R$ {valor:.2}");
        }
        if let Some(banco) = &desfecho.banco {
            println!("Banco: {banco}");
        }
        if !desfecho.parcelas.is_empty() {
            println!();
            println!("Cronograma de Parcelas");
            println!("{:<20} {:>12}", "Data de Vencimento", "Valor (R$)");
            for parcela in &desfecho.parcelas {
                println!(
                    "{:<20} {:>12.2}",
                    formatar_data(&parcela.vencimento),
                    parcela.valor
                );
            }
        }
    } else {
        println!("Sem saldo disponível");
        if let Some(mensagem) = &desfecho.mensagem {
            println!("Mensagem: {mensagem}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

fn imprimir_avisos(report: &ImportReport) {
    if report.avisos.is_empty() {
        return;
    }
    println!("Foram encontrados alguns problemas no arquivo:");
    for aviso in report.avisos.iter().take(10) {
        println!("  - {aviso}");
    }
    if report.avisos.len() > 10 {
        println!("  ...e mais {} problemas.", report.avisos.len() - 10);
    }
}

/// Import a CSV into a new campaign and submit it as a remote batch.
pub async fn importar(
    pool: &SqlitePool,
    api: &dyn ConsultaApi,
    arquivo: &Path,
    nome: &str,
) -> Result<i64> {
    let report = importar_arquivo_ou_erro(arquivo)?;
    imprimir_avisos(&report);
    println!(
        "{} CPFs válidos encontrados no arquivo.",
        report.registros.len()
    );
    if report.registros.is_empty() {
        return Err(anyhow!("Nenhum dado válido para enviar."));
    }

    let arquivo_nome = arquivo
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("importacao.csv");
    let campanha_id = db::criar_campanha(pool, nome, Some(arquivo_nome)).await?;
    db::inserir_registros(pool, campanha_id, &report.registros).await?;
    info!(campanha_id, registros = report.registros.len(), "campaign created");

    let registros_lote: Vec<RegistroLote> = report
        .registros
        .iter()
        .map(|r| RegistroLote {
            cpf: r.cpf.clone(),
            nome: r.nome.clone(),
            telefone: r.telefone.clone(),
        })
        .collect();

    match api.inserir_lote(arquivo_nome, &registros_lote).await {
        Ok(resposta) => match ler_lote_aceite(&resposta) {
            Ok(aceite) => {
                db::registrar_lote_remoto(
                    pool,
                    campanha_id,
                    &aceite.batch_id,
                    aceite.status.as_deref(),
                )
                .await?;
                println!("Batch ID: {}", aceite.batch_id);
                if let Some(status) = &aceite.status {
                    println!("Status: {status}");
                }
                if !aceite.registros_invalidos.is_empty() {
                    println!("Registros Inválidos:");
                    for registro in &aceite.registros_invalidos {
                        println!(
                            "  CPF: {}, Nome: {}, Erro: {}",
                            registro.cpf, registro.nome, registro.erro
                        );
                    }
                }
            }
            Err(mensagem) => warn!(campanha_id, "bulk submit refused: {}", mensagem),
        },
        Err(err) => warn!(?err, campanha_id, "bulk submit failed; campaign kept locally"),
    }

    println!(
        "Campanha {campanha_id} criada. Use `campanha iniciar {campanha_id}` para começar as consultas."
    );
    Ok(campanha_id)
}

fn importar_arquivo_ou_erro(arquivo: &Path) -> Result<ImportReport> {
    importer::importar_arquivo(arquivo).map_err(|err| anyhow!("{err}"))
}

pub async fn campanha_iniciar(
    pool: &SqlitePool,
    api: &dyn ConsultaApi,
    campanha_id: i64,
    remoto: bool,
    tick: Duration,
) -> Result<()> {
    if remoto {
        let info = db::carregar_campanha(pool, campanha_id).await?;
        match info.batch_id.as_deref() {
            Some(batch_id) => {
                api.iniciar_lote(batch_id).await?;
                println!("Consulta iniciada com sucesso no parceiro (batch {batch_id}).");
            }
            None => warn!(campanha_id, "campaign has no remote batch id"),
        }
    }
    db::iniciar_campanha(pool, campanha_id).await?;
    executar(pool, api, campanha_id, tick).await
}

pub async fn campanha_retomar(
    pool: &SqlitePool,
    api: &dyn ConsultaApi,
    campanha_id: i64,
    tick: Duration,
) -> Result<()> {
    db::retomar_campanha(pool, campanha_id).await?;
    executar(pool, api, campanha_id, tick).await
}

async fn executar(
    pool: &SqlitePool,
    api: &dyn ConsultaApi,
    campanha_id: i64,
    tick: Duration,
) -> Result<()> {
    let resumo = campanha::executar_campanha(pool, api, campanha_id, tick).await?;
    println!(
        "Campanha encerrada. Total: {}, Com Saldo: {}, Sem Saldo: {}, Erros: {}, Pendentes: {}",
        resumo.total, resumo.com_saldo, resumo.sem_saldo, resumo.erros, resumo.pendentes
    );
    Ok(())
}

pub async fn campanha_pausar(pool: &SqlitePool, campanha_id: i64) -> Result<()> {
    db::pausar_campanha(pool, campanha_id).await?;
    println!("Campanha {campanha_id} pausada. As consultas já iniciadas não são canceladas.");
    Ok(())
}

pub async fn campanha_parar(pool: &SqlitePool, campanha_id: i64) -> Result<()> {
    db::parar_campanha(pool, campanha_id).await?;
    println!("Campanha {campanha_id} parada. Os resultados já obtidos foram mantidos.");
    Ok(())
}

pub async fn campanha_status(pool: &SqlitePool, campanha_id: Option<i64>) -> Result<()> {
    match campanha_id {
        Some(id) => {
            let info = db::carregar_campanha(pool, id).await?;
            let resumo = db::resumo_campanha(pool, id).await?;
            println!("Campanha {}: {}", info.id, info.nome);
            if let Some(arquivo) = &info.arquivo_nome {
                println!("Arquivo: {arquivo}");
            }
            if let Some(batch_id) = &info.batch_id {
                println!("Batch ID: {batch_id}");
            }
            if let Some(status) = &info.batch_status {
                println!("Status do lote: {status}");
            }
            println!("Estado: {}", info.estado.as_str());
            println!("Progresso: {} / {}", resumo.processados(), resumo.total);
            println!(
                "Com Saldo: {}, Sem Saldo: {}, Erros: {}, Pendentes: {}",
                resumo.com_saldo, resumo.sem_saldo, resumo.erros, resumo.pendentes
            );
        }
        None => {
            let campanhas = db::listar_campanhas(pool).await?;
            if campanhas.is_empty() {
                println!("Nenhuma campanha cadastrada.");
                return Ok(());
            }
            println!("{:<6} {:<10} {:<20} Nome", "ID", "Estado", "Criada em");
            for info in campanhas {
                println!(
                    "{:<6} {:<10} {:<20} {}",
                    info.id,
                    info.estado.as_str(),
                    info.created_at.format("%d/%m/%Y %H:%M:%S"),
                    info.nome
                );
            }
        }
    }
    Ok(())
}

pub async fn campanha_exportar(
    pool: &SqlitePool,
    campanha_id: i64,
    saida: Option<&Path>,
) -> Result<()> {
    let registros = db::registros_campanha(pool, campanha_id).await?;
    if registros.is_empty() {
        return Err(anyhow!("campanha {} não possui registros", campanha_id));
    }
    let nome_padrao = export::nome_arquivo("resultados_campanha", Utc::now());
    let destino = saida
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new(&nome_padrao).to_path_buf());
    let arquivo = std::fs::File::create(&destino)?;
    export::exportar_campanha(arquivo, &registros)?;
    println!("Arquivo gerado: {}", destino.display());
    Ok(())
}

pub async fn campanha_lotes(api: &dyn ConsultaApi) -> Result<()> {
    let resposta = api.lotes().await?;
    let lotes: Vec<LoteRemoto> = serde_json::from_value(resposta).unwrap_or_default();
    if lotes.is_empty() {
        println!("Nenhum lote encontrado no parceiro.");
        return Ok(());
    }
    println!(
        "{:<24} {:<20} {:<10} {:<10} Arquivo",
        "Batch ID", "Criado em", "Total", "Processados"
    );
    for lote in lotes {
        println!(
            "{:<24} {:<20} {:<10} {:<10} {}",
            lote.batch_id,
            formatar_data_hora(&lote.created_at),
            lote.total_records,
            lote.processed_records,
            lote.file_name
        );
    }
    Ok(())
}

/// Daemon mode: keep draining whichever campaigns are running, one record per
/// tick.
pub async fn worker(pool: &SqlitePool, api: &dyn ConsultaApi, tick: Duration) -> Result<()> {
    info!("worker started");
    loop {
        match campanha::processar_alguma(pool, api).await {
            Ok(_) => {}
            Err(err) => warn!(?err, "worker tick failed"),
        }
        tokio::time::sleep(tick).await;
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

pub async fn historico_local(
    pool: &SqlitePool,
    filtro: &FiltroHistorico,
    exportar: Option<&Path>,
) -> Result<()> {
    let registros = historico::filtrar(db::listar_historico(pool).await?, filtro);
    let stats = historico::estatisticas(&registros);
    println!(
        "Total: {}  Com Saldo: {}  Sem Saldo: {}  Erro: {}",
        stats.total, stats.com_saldo, stats.sem_saldo, stats.erro
    );

    if let Some(destino) = exportar {
        let arquivo = std::fs::File::create(destino)?;
        export::exportar_historico(arquivo, &registros)?;
        println!("Arquivo gerado: {}", destino.display());
        return Ok(());
    }

    for registro in &registros {
        println!(
            "{:<16} {:<20} {:<12} {:<20} {}",
            mascarar_cpf(&registro.cpf),
            registro.nome.as_deref().unwrap_or("-"),
            registro.status.rotulo(),
            formatar_telefone(registro.telefone.as_deref()),
            registro.created_at.format("%d/%m/%Y %H:%M:%S")
        );
    }
    Ok(())
}

pub async fn historico_remoto(api: &dyn ConsultaApi) -> Result<()> {
    let consultas = historico::ler_historico_remoto(api.historico().await?);
    if consultas.is_empty() {
        println!("Nenhuma consulta no histórico remoto.");
        return Ok(());
    }
    for consulta in &consultas {
        println!(
            "{:<16} {:<20} {:<12} {}",
            mascarar_cpf(&consulta.cpf),
            if consulta.nome.is_empty() { "-" } else { consulta.nome.as_str() },
            consulta.status,
            formatar_data_hora(&consulta.created_at)
        );
    }
    println!("{} consultas.", consultas.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Customer lookup & registration
// ---------------------------------------------------------------------------

pub async fn cliente_buscar(api: &dyn ConsultaApi, cpf_entrada: &str) -> Result<()> {
    let cpf = cpf_completo(cpf_entrada)?;
    let dados = api.buscar_cliente(&cpf).await?;
    let vazio = dados.as_object().map(|o| o.is_empty()).unwrap_or(true);
    if vazio {
        println!("Cliente não encontrado na base de dados.");
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&dados)?);
    Ok(())
}

pub async fn clientes_cadastrar(api: &dyn ConsultaApi, arquivo: &Path) -> Result<()> {
    let conteudo = std::fs::read_to_string(arquivo)?;
    let (registros, pendentes) =
        importer::ler_clientes_csv(&conteudo).map_err(|err| anyhow!("{err}"))?;
    let quantos = registros.as_array().map(Vec::len).unwrap_or(0);
    if quantos == 0 {
        return Err(anyhow!("Não há dados válidos para importar."));
    }
    if !pendentes.is_empty() {
        println!(
            "{} registros com status pendente serão consultados em lote.",
            pendentes.len()
        );
    }
    api.cadastrar_clientes(&registros).await?;
    println!("Dados cadastrados com sucesso! {quantos} registros foram enviados.");
    Ok(())
}

// ---------------------------------------------------------------------------
// VCTEX protocols
// ---------------------------------------------------------------------------

pub async fn vctex_protocolos(
    api: &dyn ConsultaApi,
    filtro_protocolo: Option<&str>,
    filtro_data: Option<&str>,
) -> Result<()> {
    let protocolos = ler_protocolos(&api.vctex_protocolos().await?);
    let filtrados: Vec<_> = protocolos
        .into_iter()
        .filter(|p| {
            filtro_protocolo
                .map(|f| p.protocolo.contains(f))
                .unwrap_or(true)
                && filtro_data.map(|f| p.data.contains(f)).unwrap_or(true)
        })
        .collect();

    if filtrados.is_empty() {
        println!("Nenhum protocolo encontrado.");
        return Ok(());
    }
    println!("{:<24} Data", "Protocolo");
    for protocolo in &filtrados {
        println!(
            "{:<24} {}",
            protocolo.protocolo,
            formatar_data_hora(&protocolo.data)
        );
    }
    Ok(())
}

pub async fn vctex_consultar(api: &dyn ConsultaApi, protocolo: &str) -> Result<()> {
    let detalhe = ler_consulta_protocolo(&api.vctex_consulta_lote(protocolo).await?);

    match &detalhe.cpfs {
        Some(cpfs) => {
            println!("CPFs do protocolo {protocolo}:");
            for cpf in cpfs {
                println!("  {cpf}");
            }
        }
        None => println!("Formato de resposta inválido ou nenhum CPF encontrado."),
    }

    match &detalhe.resumo {
        Some(resumo) => {
            println!();
            if let Some(id) = &resumo.batch_query_id {
                println!("BatchQueryId: {id}");
            }
            if let Some(mensagem) = &resumo.message {
                println!("Mensagem: {mensagem}");
            }
            if let Some(limite) = resumo.limite_mensal {
                println!("Limite mensal de consultas: {limite}");
            }
            if let Some(restantes) = resumo.restantes_no_mes {
                println!("Consultas restantes no mês: {restantes}");
            }
            if !resumo.pendentes_fim_do_dia.is_empty() {
                println!(
                    "Consultas agendadas para o fim do dia: {}",
                    resumo.pendentes_fim_do_dia.join(", ")
                );
            }
        }
        None => println!("Informações do BatchQueryId não encontradas na resposta."),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Facta credentials & token
// ---------------------------------------------------------------------------

pub async fn facta_salvar(
    pool: &SqlitePool,
    usuario: &str,
    senha: &str,
    ambiente: Ambiente,
) -> Result<()> {
    facta::validar_credenciais(usuario, senha).map_err(|err| anyhow!("{err}"))?;
    let credenciais = Credenciais {
        usuario: usuario.to_string(),
        senha: senha.to_string(),
        ambiente,
    };
    db::salvar_credenciais(pool, &credenciais).await?;
    println!("Credenciais salvas com sucesso!");
    Ok(())
}

pub async fn facta_token(pool: &SqlitePool, cfg: &crate::config::Config) -> Result<()> {
    let Some(credenciais) = db::carregar_credenciais(pool).await? else {
        return Err(anyhow!("{}", facta::FactaError::SemCredenciais));
    };
    let agora = Utc::now();
    let token = facta::gerar_token(&credenciais, agora);
    db::salvar_token(pool, &token).await?;

    println!("Token gerado com sucesso!");
    println!("Ambiente: {}", credenciais.ambiente.as_str());
    println!(
        "Endpoint (não chamado, simulação): {}",
        facta::url_token(&cfg.facta, credenciais.ambiente)
    );
    println!("Token: {}", token.token);
    println!("Data de expiração: {}", facta::expira_formatado(&token));
    Ok(())
}

pub async fn facta_status(pool: &SqlitePool) -> Result<()> {
    match db::carregar_token_valido(pool, Utc::now()).await? {
        Some(token) => {
            println!("Token Ativo");
            println!("Token: {}", token.token);
            println!("Expira em: {}", facta::tempo_restante(&token, Utc::now()));
            println!("Data de expiração: {}", facta::expira_formatado(&token));
        }
        None => println!(
            "Nenhum token ativo no momento. Gere um novo token para realizar operações com a API Facta."
        ),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

pub async fn proposta_digitar(pool: &SqlitePool, nova: &NovaProposta) -> Result<()> {
    let proposta = propostas::validar(nova).map_err(|err| anyhow!("{err}"))?;
    let id = db::inserir_proposta(pool, &proposta).await?;
    println!("Proposta cadastrada com sucesso! (id {id})");
    Ok(())
}

pub async fn proposta_listar(pool: &SqlitePool, filtro: &FiltroPropostas) -> Result<()> {
    let listadas = propostas::filtrar(db::listar_propostas(pool).await?, filtro);
    let resumo = propostas::resumo(&listadas);
    println!(
        "Total: {}  Pendentes: {}  Em Análise: {}  Aprovadas: {}  Negadas: {}",
        resumo.total, resumo.pendentes, resumo.em_analise, resumo.aprovadas, resumo.negadas
    );
    for proposta in &listadas {
        println!(
            "{:<6} {:<24} {:<16} {:<10} R$ {:>10.2} {:<12} {}",
            proposta.id,
            proposta.cliente,
            mascarar_cpf(&proposta.cpf),
            proposta.banco,
            proposta.valor,
            proposta.status.rotulo(),
            proposta.data_envio.format("%d/%m/%Y")
        );
    }
    Ok(())
}

pub async fn proposta_situacao(
    pool: &SqlitePool,
    proposta_id: i64,
    status: StatusProposta,
) -> Result<()> {
    db::atualizar_situacao_proposta(pool, proposta_id, status).await?;
    println!(
        "Proposta {} atualizada para {}.",
        proposta_id,
        status.rotulo()
    );
    Ok(())
}

pub async fn proposta_exportar(pool: &SqlitePool, saida: Option<&Path>) -> Result<()> {
    let listadas = db::listar_propostas(pool).await?;
    if listadas.is_empty() {
        return Err(anyhow!("nenhuma proposta cadastrada"));
    }
    let nome_padrao = export::nome_arquivo("propostas", Utc::now());
    let destino = saida
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new(&nome_padrao).to_path_buf());
    let arquivo = std::fs::File::create(&destino)?;
    export::exportar_propostas(arquivo, &listadas)?;
    println!("Arquivo gerado: {}", destino.display());
    Ok(())
}
