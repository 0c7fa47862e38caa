use stockroom_core::uuid_id;

uuid_id!(
    /// Stock item identifier.
    pub struct ItemId,
    "ItemId"
);

uuid_id!(
    /// Usage record identifier.
    ///
    /// Generated by the caller before the insert so a retried insert can be
    /// recognised as a replay of the same record.
    pub struct UsageRecordId,
    "UsageRecordId"
);

uuid_id!(pub struct CategoryId, "CategoryId");
uuid_id!(pub struct BrandId, "BrandId");
uuid_id!(pub struct LocationId, "LocationId");

uuid_id!(
    /// Purchase order identifier.
    pub struct OrderId,
    "OrderId"
);
