use actix_web::{web, HttpResponse};

use crate::core::error::ServiceError;
use crate::models::portfolio::{CreateBlock, CreatePortfolio, CreateSection, UpdateBlock, UpdatePortfolio, UpdateSection};
use crate::services::portfolios::{self, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::services::Page;
use crate::web::auth::AuthUser;
use crate::web::models::{
    DataMessageResponse, DataResponse, IncludeBlocksQuery, MessageResponse, PaginatedResponse, PortfolioListQuery,
    UseTemplateRequest,
};
use crate::web::server::AppState;

fn parse_portfolio_id(raw: &str) -> Result<i64, ServiceError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ServiceError::validation("Invalid portfolio id"))
}

pub async fn create_portfolio(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<CreatePortfolio>,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = data.db.lock().await;
    let portfolio = portfolios::create_portfolio(&mut conn, caller.id(), &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(portfolio)))
}

pub async fn use_template(
    data: web::Data<AppState>,
    caller: AuthUser,
    template_id: web::Path<i64>,
    body: Option<web::Json<UseTemplateRequest>>,
) -> Result<HttpResponse, ServiceError> {
    let name = body.and_then(|b| b.into_inner().portfolio_name);
    let mut conn = data.db.lock().await;
    let portfolio = portfolios::create_from_template(&mut conn, caller.id(), template_id.into_inner(), name.as_deref())?;
    Ok(HttpResponse::Created().json(DataMessageResponse {
        data: portfolio,
        message: "New portfolio created with template sections".to_string(),
    }))
}

pub async fn list_my_portfolios(
    data: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<PortfolioListQuery>,
) -> Result<HttpResponse, ServiceError> {
    let page = Page::new(query.page, query.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let conn = data.db.lock().await;
    let (items, total) = portfolios::list_mine(&conn, caller.id(), page, query.include_blocks.unwrap_or(true))?;
    Ok(HttpResponse::Ok().json(PaginatedResponse {
        data: items,
        page: page.page,
        limit: page.limit,
        total,
        total_pages: page.total_pages(total),
    }))
}

pub async fn get_active_portfolio(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    match portfolios::get_active(&conn, caller.id())? {
        Some(portfolio) => Ok(HttpResponse::Ok().json(DataResponse::new(portfolio))),
        None => Ok(HttpResponse::Ok().json(DataMessageResponse {
            data: None::<()>,
            message: "No active portfolio found".to_string(),
        })),
    }
}

/// Owners read their own portfolios; reviewers may read any
pub async fn get_portfolio(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
    query: web::Query<IncludeBlocksQuery>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_portfolio_id(&id)?;
    let owner = if caller.is_reviewer() { None } else { Some(caller.id()) };
    let conn = data.db.lock().await;
    let portfolio = portfolios::get_portfolio(&conn, id, owner, query.include_blocks.unwrap_or(true))?;
    Ok(HttpResponse::Ok().json(DataResponse::new(portfolio)))
}

pub async fn update_portfolio(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
    body: web::Json<UpdatePortfolio>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_portfolio_id(&id)?;
    let mut conn = data.db.lock().await;
    let portfolio = portfolios::update_portfolio(&mut conn, caller.id(), id, &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(portfolio)))
}

pub async fn delete_portfolio(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_portfolio_id(&id)?;
    let mut conn = data.db.lock().await;
    portfolios::delete_portfolio(&mut conn, caller.id(), id)?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Portfolio deleted successfully")))
}

// Sections

pub async fn create_section(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<CreateSection>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let section = portfolios::create_section(&conn, caller.id(), &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(section)))
}

pub async fn update_section(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<UpdateSection>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let section = portfolios::update_section(&conn, caller.id(), id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(section)))
}

pub async fn delete_section(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    portfolios::delete_section(&conn, caller.id(), id.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Section deleted successfully")))
}

// Blocks

pub async fn create_block(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<CreateBlock>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let block = portfolios::create_block(&conn, caller.id(), &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(block)))
}

pub async fn update_block(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<UpdateBlock>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let block = portfolios::update_block(&conn, caller.id(), id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(block)))
}

pub async fn delete_block(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    portfolios::delete_block(&conn, caller.id(), id.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Block deleted successfully")))
}
