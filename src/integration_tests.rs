#[cfg(test)]
mod tests {
    use crate::commands::auth::{sign_in_internal, sign_up_internal, Credentials};
    use crate::commands::catalog::{
        create_entry, delete_entry, list_entries, update_entry, LookupInput, LookupTable,
    };
    use crate::commands::company::{get_company_internal, save_company_internal, CompanyInput};
    use crate::commands::customer::{
        create_customer_internal, customer_balance_internal, search_customers_internal,
        CustomerInput,
    };
    use crate::commands::dashboard::{
        dashboard_stats_internal, sales_chart_internal, top_customers_internal,
        top_products_internal,
    };
    use crate::commands::document::{
        create_document_internal, list_user_documents_internal, DocumentInput,
    };
    use crate::commands::invoice::numbering::next_invoice_number;
    use crate::commands::invoice::{
        create_invoice_internal, delete_invoice_internal, get_invoice_internal,
        list_invoices_internal, update_invoice_internal, update_invoice_status_internal,
        InvoiceFilter, InvoiceInput, InvoiceItemInput,
    };
    use crate::commands::product::{
        create_product_internal, get_product_internal, quote_price_internal,
        update_product_internal, PriceQuery, ProductInput, ProductUnitInput,
    };
    use crate::commands::product_import::{import_products_internal, ImportRequest};
    use crate::commands::scheme::{
        create_scheme_internal, delete_scheme_internal, get_scheme_internal,
        list_schemes_internal, update_scheme_internal, SchemeFilter, SchemeInput,
        SchemeProductInput,
    };
    use crate::db::{self, CustomerType, DbPool, DiscountType, InvoiceStatus, SchemeType};
    use crate::error::BilldeskError;
    use crate::config::AppConfig;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn setup_test_db() -> DbPool {
        db::init_memory_pool()
            .await
            .expect("Failed to create in-memory pool")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    async fn lookup(pool: &DbPool, table: LookupTable, name: &str) -> i64 {
        create_entry(
            pool,
            table,
            LookupInput {
                name: name.to_string(),
                description: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn customer(name: &str, customer_type: CustomerType) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            phone: Some("9876543210".to_string()),
            address: None,
            customer_type,
        }
    }

    /// Rice sold loose (`Pcs`, 100 / 90 wholesale) or by the `Box` of ten.
    struct Fixture {
        pcs: i64,
        boxed: i64,
        product_id: i64,
        customer_id: i64,
    }

    async fn seed(pool: &DbPool, customer_type: CustomerType) -> Fixture {
        let pcs = lookup(pool, LookupTable::Units, "Pcs").await;
        let boxed = lookup(pool, LookupTable::Units, "Box").await;

        let product_id = create_product_internal(
            pool,
            ProductInput {
                name: "Basmati Rice".to_string(),
                code: "RICE-01".to_string(),
                category_id: None,
                base_unit_id: pcs,
                base_rate: 100.0,
                base_wholesale_rate: Some(90.0),
                purchase_rate: Some(70.0),
                hsn_code: Some("1006".to_string()),
                company_id: None,
                tax_percentage: Some(18.0),
                multi_units: vec![ProductUnitInput {
                    unit_id: boxed,
                    conversion_rate: 10.0,
                    retail_rate: 950.0,
                    wholesale_rate: 900.0,
                }],
            },
        )
        .await
        .unwrap();

        let customer_id = create_customer_internal(pool, customer("Ravi", customer_type))
            .await
            .unwrap();

        Fixture {
            pcs,
            boxed,
            product_id,
            customer_id,
        }
    }

    fn invoice_input(fx: &Fixture, items: Vec<InvoiceItemInput>) -> InvoiceInput {
        InvoiceInput {
            customer_id: fx.customer_id,
            invoice_date: "2025-03-15".to_string(),
            due_date: "2025-03-30".to_string(),
            items,
            manual_discount: 0.0,
            previous_balance: 0.0,
            charges: 0.0,
            paid_amount: 0.0,
            status: None,
        }
    }

    fn item(fx: &Fixture, unit_id: i64, quantity: f64, rate: Option<f64>) -> InvoiceItemInput {
        InvoiceItemInput {
            product_id: fx.product_id,
            unit_id,
            quantity,
            rate,
            discount: 0.0,
        }
    }

    #[tokio::test]
    async fn test_invoice_counter_is_sequential_per_month() {
        let pool = setup_test_db().await;
        let mut tx = pool.begin().await.unwrap();

        let first = next_invoice_number(&mut tx, date(2025, 3, 1)).await.unwrap();
        let second = next_invoice_number(&mut tx, date(2025, 3, 31)).await.unwrap();
        let april = next_invoice_number(&mut tx, date(2025, 4, 1)).await.unwrap();
        let next_year = next_invoice_number(&mut tx, date(2026, 3, 1)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first, "2503000001");
        assert_eq!(second, "2503000002");
        assert_eq!(april, "2504000001");
        assert_eq!(next_year, "2603000001");
    }

    #[tokio::test]
    async fn test_create_invoice_computes_totals_server_side() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Wholesale).await;

        let mut loose = item(&fx, fx.pcs, 3.0, None);
        loose.discount = 10.0;
        let mut input = invoice_input(&fx, vec![loose, item(&fx, fx.boxed, 1.0, Some(1000.0))]);
        input.manual_discount = 43.0;
        input.paid_amount = 200.0;

        let created = create_invoice_internal(&pool, input, date(2025, 3, 15))
            .await
            .unwrap();
        assert_eq!(created.invoice_number, "2503000001");

        let invoice = get_invoice_internal(&pool, created.id).await.unwrap();
        // 3 * 90 * 0.9 + 1000
        assert!(close(invoice.subtotal, 1243.0));
        assert!(close(invoice.total, 1200.0));
        assert!(close(invoice.total_discount, 27.0 + 43.0));
        assert!(close(invoice.total_tax, 189.61));
        assert!(close(invoice.remaining_amount, 1000.0));
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.customer_name.as_deref(), Some("Ravi"));

        let items = invoice.items.unwrap();
        assert_eq!(items.len(), 2);
        // wholesale rate picked up for the base unit
        assert!(close(items[0].rate, 90.0));
        assert!(close(items[0].total, 243.0));
        assert_eq!(items[1].unit_name.as_deref(), Some("Box"));
    }

    #[tokio::test]
    async fn test_failed_invoice_does_not_consume_a_number() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;
        let stray_unit = lookup(&pool, LookupTable::Units, "Kg").await;

        let bad = invoice_input(&fx, vec![item(&fx, stray_unit, 1.0, None)]);
        let err = create_invoice_internal(&pool, bad, date(2025, 3, 15))
            .await
            .unwrap_err();
        assert!(matches!(err, BilldeskError::Validation(_)));

        let good = invoice_input(&fx, vec![item(&fx, fx.pcs, 1.0, None)]);
        let created = create_invoice_internal(&pool, good, date(2025, 3, 15))
            .await
            .unwrap();
        assert_eq!(created.invoice_number, "2503000001");
    }

    #[tokio::test]
    async fn test_exhausted_monthly_counter_fails_and_rolls_back() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;
        sqlx::query("INSERT INTO invoice_counter (year, month, counter) VALUES (2025, 3, 999999)")
            .execute(&pool)
            .await
            .unwrap();

        let input = invoice_input(&fx, vec![item(&fx, fx.pcs, 1.0, None)]);
        let err = create_invoice_internal(&pool, input, date(2025, 3, 15))
            .await
            .unwrap_err();
        assert!(matches!(err, BilldeskError::Internal(_)));

        let counter: i64 =
            sqlx::query_scalar("SELECT counter FROM invoice_counter WHERE year = 2025 AND month = 3")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(counter, 999_999);

        let invoices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(invoices, 0);
    }

    #[tokio::test]
    async fn test_oversized_adjustments_are_rejected() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let mut input = invoice_input(&fx, vec![item(&fx, fx.pcs, 1.0, None)]);
        input.previous_balance = 7e28;
        input.charges = 7e28;
        let err = create_invoice_internal(&pool, input, date(2025, 3, 15))
            .await
            .unwrap_err();
        assert!(matches!(err, BilldeskError::Validation(_)));

        let good = invoice_input(&fx, vec![item(&fx, fx.pcs, 1.0, None)]);
        let created = create_invoice_internal(&pool, good, date(2025, 3, 15))
            .await
            .unwrap();
        assert_eq!(created.invoice_number, "2503000001");
    }

    #[tokio::test]
    async fn test_invoice_validation() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let empty = invoice_input(&fx, vec![]);
        assert!(create_invoice_internal(&pool, empty, date(2025, 3, 15)).await.is_err());

        let mut backwards = invoice_input(&fx, vec![item(&fx, fx.pcs, 1.0, None)]);
        backwards.due_date = "2025-03-01".to_string();
        assert!(create_invoice_internal(&pool, backwards, date(2025, 3, 15)).await.is_err());

        let zero_qty = invoice_input(&fx, vec![item(&fx, fx.pcs, 0.0, None)]);
        assert!(create_invoice_internal(&pool, zero_qty, date(2025, 3, 15)).await.is_err());

        let mut unknown_customer = invoice_input(&fx, vec![item(&fx, fx.pcs, 1.0, None)]);
        unknown_customer.customer_id = 999;
        assert!(create_invoice_internal(&pool, unknown_customer, date(2025, 3, 15)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_invoice_replaces_items_and_keeps_number() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let input = invoice_input(
            &fx,
            vec![item(&fx, fx.pcs, 2.0, None), item(&fx, fx.boxed, 1.0, None)],
        );
        let created = create_invoice_internal(&pool, input, date(2025, 3, 15))
            .await
            .unwrap();

        let mut edited = invoice_input(&fx, vec![item(&fx, fx.boxed, 2.0, None)]);
        edited.charges = 50.0;
        update_invoice_internal(&pool, created.id, edited).await.unwrap();

        let invoice = get_invoice_internal(&pool, created.id).await.unwrap();
        assert_eq!(invoice.invoice_number, created.invoice_number);
        assert_eq!(invoice.items.as_ref().map(Vec::len), Some(1));
        // 2 boxes at the retail rate plus charges
        assert!(close(invoice.total, 1950.0));

        let missing = update_invoice_internal(
            &pool,
            999,
            invoice_input(&fx, vec![item(&fx, fx.pcs, 1.0, None)]),
        )
        .await
        .unwrap_err();
        assert!(matches!(missing, BilldeskError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invoice_status_list_and_delete() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let first = create_invoice_internal(
            &pool,
            invoice_input(&fx, vec![item(&fx, fx.pcs, 1.0, None)]),
            date(2025, 3, 15),
        )
        .await
        .unwrap();
        let second = create_invoice_internal(
            &pool,
            invoice_input(&fx, vec![item(&fx, fx.pcs, 2.0, None)]),
            date(2025, 3, 15),
        )
        .await
        .unwrap();
        assert_eq!(second.invoice_number, "2503000002");

        let status = update_invoice_status_internal(&pool, first.id, "paid").await.unwrap();
        assert_eq!(status, InvoiceStatus::Paid);
        assert!(matches!(
            update_invoice_status_internal(&pool, first.id, "archived").await,
            Err(BilldeskError::Validation(_))
        ));
        assert!(matches!(
            update_invoice_status_internal(&pool, 999, "paid").await,
            Err(BilldeskError::NotFound(_))
        ));

        let all = list_invoices_internal(&pool, InvoiceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        // newest first
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[0].customer_name.as_deref(), Some("Ravi"));

        let paid = list_invoices_internal(
            &pool,
            InvoiceFilter {
                status: Some("paid".to_string()),
                customer_id: Some(fx.customer_id),
            },
        )
        .await
        .unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].id, first.id);

        delete_invoice_internal(&pool, first.id).await.unwrap();
        assert!(matches!(
            get_invoice_internal(&pool, first.id).await,
            Err(BilldeskError::NotFound(_))
        ));
        assert!(matches!(
            delete_invoice_internal(&pool, first.id).await,
            Err(BilldeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_product_code_unique_and_units_replaced() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let mut product = get_product_internal(&pool, fx.product_id).await.unwrap();
        assert_eq!(product.units.as_ref().map(Vec::len), Some(1));
        assert_eq!(product.base_unit_name.as_deref(), Some("Pcs"));

        let duplicate = ProductInput {
            name: "Other Rice".to_string(),
            code: "RICE-01".to_string(),
            category_id: None,
            base_unit_id: fx.pcs,
            base_rate: 10.0,
            base_wholesale_rate: None,
            purchase_rate: None,
            hsn_code: None,
            company_id: None,
            tax_percentage: None,
            multi_units: vec![],
        };
        let err = create_product_internal(&pool, duplicate.clone()).await.unwrap_err();
        assert!(matches!(err, BilldeskError::Conflict(_)));

        let mut negative = duplicate.clone();
        negative.code = "RICE-02".to_string();
        negative.base_rate = -1.0;
        assert!(matches!(
            create_product_internal(&pool, negative).await,
            Err(BilldeskError::Validation(_))
        ));

        let mut edit = duplicate;
        edit.name = "Basmati Rice Premium".to_string();
        update_product_internal(&pool, fx.product_id, edit).await.unwrap();

        product = get_product_internal(&pool, fx.product_id).await.unwrap();
        assert_eq!(product.name, "Basmati Rice Premium");
        assert_eq!(product.units.as_ref().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_price_quote_follows_customer_type() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let base = quote_price_internal(
            &pool,
            fx.product_id,
            PriceQuery {
                unit_id: None,
                customer_type: None,
            },
        )
        .await
        .unwrap();
        assert!(close(base.rate, 100.0));

        let boxed = quote_price_internal(
            &pool,
            fx.product_id,
            PriceQuery {
                unit_id: Some(fx.boxed),
                customer_type: Some(CustomerType::Wholesale),
            },
        )
        .await
        .unwrap();
        assert!(close(boxed.rate, 900.0));
    }

    #[tokio::test]
    async fn test_customer_search_and_balance() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;
        create_customer_internal(&pool, customer("Meena", CustomerType::Wholesale))
            .await
            .unwrap();

        let found = search_customers_internal(&pool, "mee").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].customer_type, CustomerType::Wholesale);
        assert_eq!(search_customers_internal(&pool, "98765").await.unwrap().len(), 2);

        for (qty, paid, status) in [
            (2.0, 50.0, InvoiceStatus::Created),
            (1.0, 0.0, InvoiceStatus::Created),
            (5.0, 0.0, InvoiceStatus::Paid),
        ] {
            let mut input = invoice_input(&fx, vec![item(&fx, fx.pcs, qty, None)]);
            input.paid_amount = paid;
            input.status = Some(status);
            create_invoice_internal(&pool, input, date(2025, 3, 15)).await.unwrap();
        }

        let balance = customer_balance_internal(&pool, fx.customer_id).await.unwrap();
        // (200 - 50) + 100; the paid invoice is settled
        assert!(close(balance.balance, 250.0));

        assert!(matches!(
            customer_balance_internal(&pool, 999).await,
            Err(BilldeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_catalog_crud() {
        let pool = setup_test_db().await;

        let saved = create_entry(
            &pool,
            LookupTable::Categories,
            LookupInput {
                name: "  Grains ".to_string(),
                description: Some(" ".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(saved.name, "Grains");
        assert_eq!(saved.description, None);

        let renamed = update_entry(
            &pool,
            LookupTable::Categories,
            saved.id,
            LookupInput {
                name: "Cereals".to_string(),
                description: Some("Rice and wheat".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Cereals");

        let missing = update_entry(
            &pool,
            LookupTable::Categories,
            999,
            LookupInput {
                name: "Nothing".to_string(),
                description: None,
            },
        )
        .await;
        assert!(matches!(missing, Err(BilldeskError::NotFound(_))));

        let blank = create_entry(
            &pool,
            LookupTable::ProductCompanies,
            LookupInput {
                name: "".to_string(),
                description: None,
            },
        )
        .await;
        assert!(matches!(blank, Err(BilldeskError::Validation(_))));

        let listed = list_entries(&pool, LookupTable::Categories).await.unwrap();
        assert_eq!(listed.len(), 1);

        delete_entry(&pool, LookupTable::Categories, saved.id).await.unwrap();
        assert!(matches!(
            delete_entry(&pool, LookupTable::Categories, saved.id).await,
            Err(BilldeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleting_a_unit_in_use_is_a_constraint_violation() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let err = delete_entry(&pool, LookupTable::Units, fx.pcs).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_company_is_a_singleton() {
        let pool = setup_test_db().await;
        assert!(get_company_internal(&pool).await.unwrap().is_none());

        let first = save_company_internal(
            &pool,
            CompanyInput {
                name: " Sharma Traders ".to_string(),
                gst: Some("27AAPFU0939F1ZV".to_string()),
                email: Some("accounts@sharma.in".to_string()),
                logo: Some("data:image/png;base64,AAAA".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let second = save_company_internal(
            &pool,
            CompanyInput {
                name: "Sharma Traders Pvt Ltd".to_string(),
                phone: Some("+91 98765 43210".to_string()),
                address: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(first.id, second.id);

        let company = get_company_internal(&pool).await.unwrap().unwrap();
        assert_eq!(company.name, "Sharma Traders Pvt Ltd");
        assert_eq!(company.address, None);
        assert_eq!(company.gst, None);

        let invalid = save_company_internal(
            &pool,
            CompanyInput {
                name: "Sharma Traders".to_string(),
                email: Some("not-an-email".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(invalid, Err(BilldeskError::Validation(_))));
    }

    fn scheme(name: &str, start: &str, end: &str) -> SchemeInput {
        SchemeInput {
            name: name.to_string(),
            scheme_type: SchemeType::Product,
            discount_type: DiscountType::Percentage,
            discount_value: Some(5.0),
            buy_quantity: None,
            free_quantity: None,
            start_date: start.to_string(),
            end_date: end.to_string(),
            categories: vec![],
            products: vec![],
        }
    }

    #[tokio::test]
    async fn test_scheme_crud_and_active_filter() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;
        let grains = lookup(&pool, LookupTable::Categories, "Grains").await;

        let mut diwali = scheme("Diwali", "2025-10-15", "2025-11-05");
        diwali.products = vec![SchemeProductInput {
            id: fx.product_id,
            unit_id: fx.boxed,
            quantity: 2.0,
        }];
        // ignored for product schemes
        diwali.categories = vec![grains];
        let diwali_id = create_scheme_internal(&pool, diwali).await.unwrap();

        let mut summer = scheme("Summer", "2025-05-01", "2025-06-30");
        summer.scheme_type = SchemeType::Category;
        summer.categories = vec![grains];
        let summer_id = create_scheme_internal(&pool, summer.clone()).await.unwrap();

        let loaded = get_scheme_internal(&pool, diwali_id).await.unwrap();
        assert_eq!(loaded.products.len(), 1);
        assert_eq!(loaded.products[0].unit_name.as_deref(), Some("Box"));
        assert!(loaded.categories.is_empty());

        let active = list_schemes_internal(
            &pool,
            SchemeFilter {
                active_on: Some("2025-11-01".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, diwali_id);
        assert_eq!(list_schemes_internal(&pool, SchemeFilter::default()).await.unwrap().len(), 2);

        summer.name = "Summer Sale".to_string();
        summer.categories = vec![];
        update_scheme_internal(&pool, summer_id, summer).await.unwrap();
        let updated = get_scheme_internal(&pool, summer_id).await.unwrap();
        assert_eq!(updated.name, "Summer Sale");
        assert!(updated.categories.is_empty());

        delete_scheme_internal(&pool, diwali_id).await.unwrap();
        assert!(matches!(
            get_scheme_internal(&pool, diwali_id).await,
            Err(BilldeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_up_and_sign_in() {
        let pool = setup_test_db().await;
        let creds = |email: &str, password: &str| Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };

        let user = sign_up_internal(&pool, creds("Owner@Shop.in ", "s3cret")).await.unwrap();
        assert_eq!(user.email, "owner@shop.in");

        let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_ne!(stored, "s3cret");

        let signed_in = sign_in_internal(&pool, creds("owner@shop.in", "s3cret")).await.unwrap();
        assert_eq!(signed_in, user);

        assert!(matches!(
            sign_in_internal(&pool, creds("owner@shop.in", "wrong")).await,
            Err(BilldeskError::Auth(_))
        ));
        assert!(matches!(
            sign_in_internal(&pool, creds("nobody@shop.in", "s3cret")).await,
            Err(BilldeskError::Auth(_))
        ));
        assert!(matches!(
            sign_up_internal(&pool, creds("owner@shop.in", "other")).await,
            Err(BilldeskError::Conflict(_))
        ));
        assert!(matches!(
            sign_up_internal(&pool, creds("", "x")).await,
            Err(BilldeskError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_documents_per_user() {
        let pool = setup_test_db().await;
        let user = sign_up_internal(
            &pool,
            Credentials {
                email: "clerk@shop.in".to_string(),
                password: "pw".to_string(),
            },
        )
        .await
        .unwrap();
        let category = lookup(&pool, LookupTable::Categories, "Grains").await;

        let doc = create_document_internal(
            &pool,
            DocumentInput {
                user_id: user.id,
                category_id: Some(category),
                unit_id: None,
                title: "Price list".to_string(),
                content: Some("Rice 100/kg".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(doc.title, "Price list");

        let docs = list_user_documents_internal(&pool, user.id).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].category_name.as_deref(), Some("Grains"));
        assert!(list_user_documents_internal(&pool, user.id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_excludes_cancelled_invoices() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let march = invoice_input(&fx, vec![item(&fx, fx.pcs, 2.0, None)]);
        create_invoice_internal(&pool, march, date(2025, 3, 15)).await.unwrap();

        let mut january = invoice_input(&fx, vec![item(&fx, fx.boxed, 1.0, None)]);
        january.invoice_date = "2025-01-10".to_string();
        january.due_date = "2025-01-20".to_string();
        create_invoice_internal(&pool, january, date(2025, 3, 15)).await.unwrap();

        let mut cancelled = invoice_input(&fx, vec![item(&fx, fx.pcs, 50.0, None)]);
        cancelled.status = Some(InvoiceStatus::Cancelled);
        create_invoice_internal(&pool, cancelled, date(2025, 3, 15)).await.unwrap();

        let stats = dashboard_stats_internal(&pool, date(2025, 3, 20)).await.unwrap();
        assert_eq!(stats.total_invoices, 2);
        assert!(close(stats.total_sales, 1150.0));
        assert!(close(stats.monthly_sales, 200.0));
        assert!(close(stats.yearly_sales, 1150.0));

        let by_month = sales_chart_internal(&pool, 2025, None).await.unwrap();
        assert_eq!(by_month.labels.len(), 12);
        assert!(close(by_month.data[0], 950.0));
        assert!(close(by_month.data[2], 200.0));

        let by_day = sales_chart_internal(&pool, 2025, Some(2)).await.unwrap();
        assert_eq!(by_day.labels.len(), 28);
        assert!(by_day.data.iter().all(|v| *v == 0.0));
        assert!(sales_chart_internal(&pool, 2025, Some(13)).await.is_err());

        let customers = top_customers_internal(&pool, None).await.unwrap();
        assert_eq!(customers.len(), 1);
        assert!(close(customers[0].total_purchase, 1150.0));

        let products = top_products_internal(&pool, Some(3)).await.unwrap();
        assert_eq!(products.len(), 1);
        assert!(close(products[0].quantity, 3.0));
        assert!(close(products[0].total, 1150.0));
    }

    #[tokio::test]
    async fn test_product_import_creates_then_updates() {
        let pool = setup_test_db().await;

        let request: ImportRequest = serde_json::from_value(json!({
            "rows": [
                {
                    "name": "Sugar",
                    "code": "SUG-1",
                    "category_name": "Groceries",
                    "base_unit_name": "Kg",
                    "base_rate": "45.5",
                    "tax_percentage": 5,
                    "company_name": "Sweet Co",
                    "additional_units": "[{\"unit_name\":\"Bag\",\"conversion_rate\":50,\"retail_rate\":2200,\"wholesale_rate\":2100}]"
                },
                {
                    "name": "Salt",
                    "code": "SAL-1",
                    "category_name": "groceries",
                    "base_unit_name": "kg",
                    "base_rate": 20,
                    "additional_units": [{"unit_name": "Packet", "conversion_rate": 1, "retail_rate": 22}]
                },
                {
                    "name": "Broken",
                    "code": "BRK-1",
                    "base_unit_name": "Kg"
                }
            ]
        }))
        .unwrap();

        let report = import_products_internal(&pool, request.rows).await.unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].row, 3);
        assert_eq!(report.errors[0].code, "BRK-1");

        // names resolved case-insensitively
        assert_eq!(list_entries(&pool, LookupTable::Categories).await.unwrap().len(), 1);
        assert_eq!(list_entries(&pool, LookupTable::Units).await.unwrap().len(), 3);

        let update: ImportRequest = serde_json::from_value(json!({
            "rows": [{
                "name": "Sugar (Refined)",
                "code": "SUG-1",
                "base_unit_name": "Kg",
                "base_rate": 48
            }]
        }))
        .unwrap();
        let report = import_products_internal(&pool, update.rows).await.unwrap();
        assert_eq!(report.updated, 1);

        let id: i64 = sqlx::query_scalar("SELECT id FROM products WHERE code = 'SUG-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let sugar = get_product_internal(&pool, id).await.unwrap();
        assert_eq!(sugar.name, "Sugar (Refined)");
        assert!(close(sugar.base_rate, 48.0));
        assert_eq!(sugar.units.as_ref().map(Vec::len), Some(0));
    }

    async fn send(pool: &DbPool, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let app = crate::build_app(AppState::new(pool.clone(), AppConfig::default()));
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_bad_request_bodies_get_json_errors() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let mut invoice = json!({
            "customerId": fx.customer_id,
            "invoiceDate": "2025-03-15",
            "dueDate": "2025-03-30",
            "items": [{"productId": fx.product_id, "unitId": fx.pcs, "quantity": 1}],
            "status": "void"
        });
        let (status, body) =
            send(&pool, Method::POST, "/api/invoices", Some(&invoice.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        // same value through the status route
        invoice["status"] = json!("created");
        let (status, created) =
            send(&pool, Method::POST, "/api/invoices", Some(&invoice.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        let uri = format!("/api/invoices/{}/status", created["id"]);
        let (status, body) = send(&pool, Method::PATCH, &uri, Some(r#"{"status":"void"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(&pool, Method::POST, "/api/customers", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(&pool, Method::GET, "/api/invoices/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_error_responses_map_to_status_codes() {
        let pool = setup_test_db().await;
        let fx = seed(&pool, CustomerType::Retail).await;

        let (status, body) = send(&pool, Method::GET, "/api/invoices/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Invoice not found");

        let uri = format!("/api/units/{}", fx.pcs);
        let (status, body) = send(&pool, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Database constraint violation");
        assert!(body["details"].is_string());

        let credentials = r#"{"email":"owner@example.com","password":"secret123"}"#;
        let (status, _) = send(&pool, Method::POST, "/api/auth/signup", Some(credentials)).await;
        assert_eq!(status, StatusCode::OK);
        let wrong = r#"{"email":"owner@example.com","password":"wrong-pass"}"#;
        let (status, body) = send(&pool, Method::POST, "/api/auth/signin", Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }
}
